//! `define_service!` builds a function-pointer service table plus free
//! functions that forward through it.
//!
//! ```rust,ignore
//! define_service! {
//!     clock => ClockServices {
//!         now() -> u64;
//!         sleep(ticks: u64);
//!     }
//! }
//!
//! // Port side:
//! register_clock_services(&MY_CLOCK);
//! // Consumer side:
//! let t = clock::now();
//! ```

#[macro_export]
macro_rules! define_service {
    (
        $name:ident => $table:ident {
            $(
                $(#[$meta:meta])*
                $method:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? ;
            )*
        }
    ) => {
        $crate::paste::paste! {
            /// Function table registered by the port.
            #[derive(Clone, Copy)]
            pub struct $table {
                $(
                    $(#[$meta])*
                    pub $method: fn($($ty),*) $(-> $ret)?,
                )*
            }

            static [<$name:upper _SERVICES>]: $crate::ServiceCell<$table> =
                $crate::ServiceCell::new();

            pub fn [<register_ $name _services>](services: &'static $table) {
                [<$name:upper _SERVICES>].register(services);
            }

            #[inline]
            pub fn [<is_ $name _initialized>]() -> bool {
                [<$name:upper _SERVICES>].is_registered()
            }

            #[inline]
            pub fn [<$name _services>]() -> &'static $table {
                [<$name:upper _SERVICES>].get()
            }

            $(
                $(#[$meta])*
                #[inline]
                pub fn $method($($arg: $ty),*) $(-> $ret)? {
                    ([<$name _services>]().$method)($($arg),*)
                }
            )*
        }
    };
}
