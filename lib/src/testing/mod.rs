//! Test tooling shared by every crate in the workspace.
//!
//! Test bodies are plain `fn() -> TestResult` functions using the assertion
//! macros below; [`define_test_suite!`] turns a list of them into `#[test]`
//! items that run on the hosted RTOS port.

mod assertions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Panic,
    Skipped,
}

impl TestResult {
    #[inline]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Panic)
    }
}

/// Run one test body, installing the hosted port first when available.
pub fn run_single_test(name: &str, test: impl FnOnce() -> TestResult) -> TestResult {
    #[cfg(feature = "host")]
    crate::host::install();

    let result = test();
    if result.is_failure() {
        crate::klog_info!("TEST {}: {:?}", name, result);
    }
    result
}

#[macro_export]
macro_rules! pass {
    () => {
        $crate::testing::TestResult::Pass
    };
}

#[macro_export]
macro_rules! fail {
    () => {
        $crate::testing::TestResult::Fail
    };
    ($msg:expr) => {{
        $crate::klog_info!("TEST FAIL: {}", $msg);
        $crate::testing::TestResult::Fail
    }};
    ($fmt:expr, $($arg:tt)*) => {{
        $crate::klog_info!(concat!("TEST FAIL: ", $fmt), $($arg)*);
        $crate::testing::TestResult::Fail
    }};
}

#[macro_export]
macro_rules! run_test {
    ($test_fn:expr) => {{ $crate::testing::run_single_test(stringify!($test_fn), || $test_fn()) }};

    ($name:expr, $test_fn:expr) => {{ $crate::testing::run_single_test($name, || $test_fn()) }};
}

/// Expand a list of `fn() -> TestResult` into `#[test]` items grouped in a
/// `<suite>_suite` module.
#[macro_export]
macro_rules! define_test_suite {
    ($suite_name:ident, [$($test_fn:ident),* $(,)?]) => {
        $crate::paste::paste! {
            #[cfg(test)]
            mod [<$suite_name _suite>] {
                $(
                    #[test]
                    fn $test_fn() {
                        let result = $crate::run_test!(
                            concat!(stringify!($suite_name), "::", stringify!($test_fn)),
                            super::$test_fn
                        );
                        assert!(result.is_pass(), "{} returned {:?}", stringify!($test_fn), result);
                    }
                )*
            }
        }
    };
}
