use alloc::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ipcore_abi::net as abi;
use ipcore_lib::testing::TestResult;
use ipcore_lib::{assert_eq_test, assert_err, assert_ok, assert_test, pass};

use crate::driver::{DriverCommand, DriverReply, DriverResult, InterfaceCapability, IpDriver, LinkInfo};
use crate::ip::{HelperState, IpInstance};
use crate::test_support::{MockDriver, RecordingHooks, attach, instance, mask, running_instance, v4};
use crate::types::{IfIndex, IpError, Ipv4Addr, MacAddr};
use crate::{IpConfig, LOOPBACK_INTERFACE, MAX_PHYSICAL_INTERFACES};

pub fn test_attach_first_free_slot() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let (eth0, _) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    let (eth1, _) = attach(&ip, "eth1", v4(10, 0, 0, 5), 24);
    assert_eq_test!(eth0, IfIndex(0));
    assert_eq_test!(eth1, IfIndex(1));

    assert_ok!(ip.interface_detach(eth0));
    let (again, _) = attach(&ip, "eth2", v4(172, 16, 0, 1), 16);
    assert_eq_test!(again, IfIndex(0), "freed slot reused");
    pass!()
}

pub fn test_attach_duplicate_address() -> TestResult {
    let ip = instance(RecordingHooks::new());
    attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    let before = ip.interfaces();

    let driver = MockDriver::new();
    assert_err!(
        ip.interface_attach("eth1", v4(192, 168, 1, 10), mask(24), driver.clone()),
        IpError::DuplicateAddress
    );
    assert_eq_test!(ip.interfaces(), before, "table unchanged");
    assert_test!(driver.commands().is_empty(), "driver never touched");
    pass!()
}

pub fn test_attach_wildcard_address_may_repeat() -> TestResult {
    let ip = instance(RecordingHooks::new());
    attach(&ip, "eth0", Ipv4Addr::UNSPECIFIED, 0);
    let driver = MockDriver::new();
    assert_ok!(ip.interface_attach("eth1", Ipv4Addr::UNSPECIFIED, mask(0), driver));
    pass!()
}

pub fn test_attach_no_free_slot() -> TestResult {
    let ip = instance(RecordingHooks::new());
    for i in 0..MAX_PHYSICAL_INTERFACES {
        let driver = MockDriver::new();
        assert_ok!(ip.interface_attach("eth", v4(10, 0, i as u8, 1), mask(24), driver));
    }
    let driver = MockDriver::new();
    assert_err!(
        ip.interface_attach("ethx", v4(10, 9, 0, 1), mask(24), driver),
        IpError::NoFreeSlot
    );
    pass!()
}

pub fn test_attach_before_helper_defers_bring_up() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let (_, driver) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    assert_test!(driver.commands().is_empty(), "no commands before the helper runs");

    assert_ok!(ip.helper_startup());
    assert_eq_test!(ip.helper_state(), HelperState::Running);
    assert_eq_test!(
        driver.command_codes(),
        vec![abi::LINK_INTERFACE_ATTACH, abi::LINK_INITIALIZE, abi::LINK_ENABLE]
    );
    pass!()
}

pub fn test_attach_while_running_brings_up_in_order() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let (eth0, driver) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    assert_eq_test!(
        driver.command_codes(),
        vec![abi::LINK_INTERFACE_ATTACH, abi::LINK_INITIALIZE, abi::LINK_ENABLE]
    );

    let info = assert_ok!(ip.interface_info_get(eth0));
    assert_test!(info.link_up);
    assert_eq_test!(info.physical_address, MacAddr([0x02, 0, 0, 0, 0, 0x01]));
    assert_eq_test!(info.network, v4(192, 168, 1, 0));
    pass!()
}

pub fn test_bring_up_stops_at_failed_phase() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let driver = MockDriver::new();
    driver.fail_on(DriverCommand::Initialize);
    let eth0 = assert_ok!(ip.interface_attach("eth0", v4(192, 168, 1, 10), mask(24), driver.clone()));

    assert_eq_test!(
        driver.command_codes(),
        vec![abi::LINK_INTERFACE_ATTACH, abi::LINK_INITIALIZE]
    );
    assert_test!(!assert_ok!(ip.interface_info_get(eth0)).link_up);
    pass!()
}

pub fn test_bring_up_skips_unhandled_phase() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let driver = MockDriver::new();
    driver.leave_unhandled(DriverCommand::Attach);
    let eth0 = assert_ok!(ip.interface_attach("eth0", v4(192, 168, 1, 10), mask(24), driver.clone()));

    assert_eq_test!(driver.commands().len(), 3);
    assert_test!(assert_ok!(ip.interface_info_get(eth0)).link_up);
    pass!()
}

/// Acknowledges every command without touching `LinkInfo`.
struct AckDriver;

impl IpDriver for AckDriver {
    fn command(&self, _link: &mut LinkInfo, _command: DriverCommand) -> DriverResult {
        Ok(DriverReply::Done)
    }
}

pub fn test_bring_up_marks_link_up_for_silent_driver() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let eth0 = assert_ok!(ip.interface_attach(
        "eth0",
        v4(192, 168, 1, 10),
        mask(24),
        Arc::new(AckDriver)
    ));

    assert_test!(assert_ok!(ip.interface_info_get(eth0)).link_up);
    let route = assert_ok!(ip.route_find(v4(192, 168, 1, 20), None));
    assert_eq_test!(route.interface, eth0);
    assert_eq_test!(route.next_hop, v4(192, 168, 1, 20));
    pass!()
}

pub fn test_attach_joins_all_hosts_with_multicast() -> TestResult {
    let config = IpConfig {
        multicast: true,
        ..IpConfig::default()
    };
    let ip = IpInstance::new("mc", config, RecordingHooks::new());
    assert_ok!(ip.helper_startup());
    let (_, driver) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);

    let group = MacAddr::ipv4_multicast(Ipv4Addr::from_u32(abi::IP_ALL_HOSTS_ADDRESS));
    assert_eq_test!(driver.commands().last().copied(), Some(DriverCommand::MulticastJoin(group)));
    pass!()
}

pub fn test_detach_drops_routes_and_gateway() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let (eth0, driver) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    let (eth1, _) = attach(&ip, "eth1", v4(172, 16, 0, 10), 16);
    assert_ok!(ip.static_route_add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1)));
    assert_ok!(ip.static_route_add(v4(10, 1, 0, 0), mask(16), v4(172, 16, 0, 1)));
    assert_ok!(ip.gateway_address_set(v4(192, 168, 1, 1)));

    assert_ok!(ip.interface_detach(eth0));
    assert_eq_test!(driver.commands().last().copied(), Some(DriverCommand::Detach));
    assert_err!(ip.interface_info_get(eth0), IpError::InvalidInterface);
    let routes = ip.static_routes();
    assert_eq_test!(routes.len(), 1);
    assert_eq_test!(routes[0].interface, eth1);
    assert_err!(ip.gateway_address_get(), IpError::NotFound);
    pass!()
}

pub fn test_detach_refuses_loopback() -> TestResult {
    let ip = instance(RecordingHooks::new());
    assert_err!(ip.interface_detach(LOOPBACK_INTERFACE), IpError::InvalidInterface);
    assert_err!(ip.interface_detach(IfIndex(2)), IpError::InvalidInterface);
    pass!()
}

static NOTIFIED: AtomicUsize = AtomicUsize::new(0);

fn count_change(_ip: &IpInstance, index: IfIndex, address: Ipv4Addr, _mask: Ipv4Addr) {
    if index == IfIndex(0) && address == Ipv4Addr::new(192, 168, 5, 10) {
        NOTIFIED.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_address_set_recomputes_network_and_notifies() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let (eth0, _) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    assert_ok!(ip.address_change_notify_set(Some(count_change)));

    let before = NOTIFIED.load(Ordering::SeqCst);
    assert_ok!(ip.interface_address_set(eth0, v4(192, 168, 5, 10), mask(16)));
    assert_eq_test!(NOTIFIED.load(Ordering::SeqCst), before + 1);

    assert_eq_test!(
        assert_ok!(ip.interface_address_get(eth0)),
        (v4(192, 168, 5, 10), mask(16))
    );
    assert_eq_test!(assert_ok!(ip.interface_info_get(eth0)).network, v4(192, 168, 0, 0));
    assert_err!(
        ip.interface_address_set(IfIndex(3), v4(1, 2, 3, 4), mask(8)),
        IpError::InvalidInterface
    );
    pass!()
}

pub fn test_loopback_present_by_default() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let lo = assert_ok!(ip.interface_info_get(LOOPBACK_INTERFACE));
    assert_eq_test!(lo.address, Ipv4Addr::LOCALHOST);
    assert_eq_test!(lo.mtu, abi::LOOPBACK_MTU);
    assert_test!(lo.link_up);

    let config = IpConfig {
        loopback: false,
        ..IpConfig::default()
    };
    let bare = IpInstance::new("bare", config, RecordingHooks::new());
    assert_err!(bare.interface_info_get(LOOPBACK_INTERFACE), IpError::InvalidInterface);
    pass!()
}

pub fn test_capability_and_mtu() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let (eth0, driver) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);

    let caps = InterfaceCapability::IPV4_TX_CHECKSUM | InterfaceCapability::TCP_TX_CHECKSUM;
    assert_ok!(ip.interface_capability_set(eth0, caps));
    assert_eq_test!(assert_ok!(ip.interface_capability_get(eth0)), caps);
    assert_eq_test!(driver.commands().last().copied(), Some(DriverCommand::CapabilitySet(caps)));

    assert_ok!(ip.interface_mtu_set(eth0, 576));
    assert_eq_test!(assert_ok!(ip.interface_info_get(eth0)).mtu, 576);
    pass!()
}

pub fn test_physical_address_set_falls_back_on_unhandled() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let driver = MockDriver::new();
    let mac = MacAddr([0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
    driver.leave_unhandled(DriverCommand::SetPhysicalAddress(mac));
    let eth0 = assert_ok!(ip.interface_attach("eth0", v4(192, 168, 1, 10), mask(24), driver.clone()));

    assert_ok!(ip.interface_physical_address_set(eth0, mac));
    assert_eq_test!(assert_ok!(ip.interface_physical_address_get(eth0)), mac);

    let other = MacAddr([0x02, 1, 1, 1, 1, 1]);
    driver.fail_on(DriverCommand::SetPhysicalAddress(other));
    assert_err!(ip.interface_physical_address_set(eth0, other), IpError::DriverFailed);
    assert_eq_test!(assert_ok!(ip.interface_physical_address_get(eth0)), mac);
    pass!()
}

pub fn test_direct_command_passthrough() -> TestResult {
    let ip = running_instance(RecordingHooks::new());
    let (eth0, _) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);

    let reply = assert_ok!(ip.driver_direct_command(eth0, abi::LINK_USER_COMMAND, 41));
    assert_eq_test!(reply, DriverReply::Value(42));
    assert_err!(
        ip.driver_direct_command(LOOPBACK_INTERFACE, abi::LINK_USER_COMMAND, 0),
        IpError::Unhandled
    );
    pass!()
}

pub fn test_gateway_requires_owner() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let (eth0, _) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);

    assert_err!(ip.gateway_address_set(v4(10, 0, 0, 1)), IpError::AddressError);
    assert_err!(ip.gateway_address_set(Ipv4Addr::UNSPECIFIED), IpError::AddressError);
    assert_ok!(ip.gateway_address_set(v4(192, 168, 1, 1)));

    let gw = assert_ok!(ip.gateway_address_get());
    assert_eq_test!(gw.interface, eth0);
    assert_ok!(ip.gateway_address_clear());
    assert_err!(ip.gateway_address_get(), IpError::NotFound);
    pass!()
}

pub fn test_static_route_default_needs_owner() -> TestResult {
    let ip = instance(RecordingHooks::new());
    attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    assert_err!(
        ip.static_route_add(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED),
        IpError::AddressError
    );
    pass!()
}

pub fn test_thread_only_operations_refuse_interrupt_context() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let result = ipcore_lib::host::run_as_interrupt(|| {
        ip.interface_attach("eth0", v4(192, 168, 1, 10), mask(24), MockDriver::new())
    });
    assert_err!(result, IpError::CallerError);
    let result = ipcore_lib::host::run_as_interrupt(|| ip.gateway_address_clear());
    assert_err!(result, IpError::CallerError);
    pass!()
}

ipcore_lib::define_test_suite!(
    interface,
    [
        test_attach_first_free_slot,
        test_attach_duplicate_address,
        test_attach_wildcard_address_may_repeat,
        test_attach_no_free_slot,
        test_attach_before_helper_defers_bring_up,
        test_attach_while_running_brings_up_in_order,
        test_bring_up_stops_at_failed_phase,
        test_bring_up_skips_unhandled_phase,
        test_bring_up_marks_link_up_for_silent_driver,
        test_attach_joins_all_hosts_with_multicast,
        test_detach_drops_routes_and_gateway,
        test_detach_refuses_loopback,
        test_address_set_recomputes_network_and_notifies,
        test_loopback_present_by_default,
        test_capability_and_mtu,
        test_physical_address_set_falls_back_on_unhandled,
        test_direct_command_passthrough,
        test_gateway_requires_owner,
        test_static_route_default_needs_owner,
        test_thread_only_operations_refuse_interrupt_context,
    ]
);
