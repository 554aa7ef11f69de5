use ipcore_lib::testing::TestResult;
use ipcore_lib::{assert_eq_test, assert_err, assert_ok, assert_test, pass};

use crate::ROUTING_TABLE_SIZE;
use crate::route::{RouteEntry, RouteUpdate, StaticRouteTable};
use crate::test_support::{RecordingHooks, attach, instance, mask, v4};
use crate::types::{IfIndex, IpError};

pub fn test_route_add_sorts_by_mask() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 1, 2, 0), mask(24), v4(192, 168, 1, 2), IfIndex(0)));
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 3), IfIndex(0)));

    let masks: Vec<u32> = table.entries().iter().map(|e| e.prefix_len()).collect();
    assert_eq_test!(masks, vec![24, 16, 8], "longest prefix first");
    pass!()
}

pub fn test_route_equal_masks_keep_insertion_order() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 2, 0, 0), mask(16), v4(192, 168, 1, 2), IfIndex(0)));
    assert_ok!(table.add(v4(10, 3, 0, 0), mask(16), v4(192, 168, 1, 3), IfIndex(0)));

    let nets: Vec<_> = table.entries().iter().map(|e| e.network).collect();
    assert_eq_test!(nets, vec![v4(10, 1, 0, 0), v4(10, 2, 0, 0), v4(10, 3, 0, 0)]);
    pass!()
}

pub fn test_route_add_masks_network() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 1, 2, 3), mask(16), v4(192, 168, 1, 1), IfIndex(0)));
    assert_eq_test!(table.entries()[0].network, v4(10, 1, 0, 0));
    pass!()
}

pub fn test_route_duplicate_updates_in_place() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_eq_test!(
        assert_ok!(table.add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1), IfIndex(0))),
        RouteUpdate::Inserted
    );
    assert_eq_test!(
        assert_ok!(table.add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 9), IfIndex(1))),
        RouteUpdate::Updated
    );
    assert_eq_test!(table.len(), 1);
    assert_eq_test!(table.entries()[0].next_hop, v4(192, 168, 1, 9));
    assert_eq_test!(table.entries()[0].interface, IfIndex(1));
    pass!()
}

pub fn test_route_overflow() -> TestResult {
    let mut table = StaticRouteTable::new();
    for i in 0..ROUTING_TABLE_SIZE {
        assert_ok!(table.add(v4(10, i as u8, 0, 0), mask(16), v4(192, 168, 1, 1), IfIndex(0)));
    }
    assert_err!(
        table.add(v4(172, 16, 0, 0), mask(12), v4(192, 168, 1, 1), IfIndex(0)),
        IpError::Overflow
    );
    assert_eq_test!(table.len(), ROUTING_TABLE_SIZE);

    // A duplicate still updates when the table is full.
    assert_eq_test!(
        assert_ok!(table.add(v4(10, 3, 0, 0), mask(16), v4(192, 168, 1, 7), IfIndex(0))),
        RouteUpdate::Updated
    );
    pass!()
}

pub fn test_route_delete_shifts_entries() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 2, 0, 0), mask(16), v4(192, 168, 1, 2), IfIndex(0)));
    assert_ok!(table.add(v4(10, 3, 0, 0), mask(16), v4(192, 168, 1, 3), IfIndex(0)));

    let removed = assert_ok!(table.delete(v4(10, 2, 0, 0), mask(16)));
    assert_eq_test!(removed.next_hop, v4(192, 168, 1, 2));
    let nets: Vec<_> = table.entries().iter().map(|e| e.network).collect();
    assert_eq_test!(nets, vec![v4(10, 1, 0, 0), v4(10, 3, 0, 0)]);

    assert_err!(table.delete(v4(10, 2, 0, 0), mask(16)), IpError::NotFound);
    assert_err!(table.delete(v4(10, 1, 0, 0), mask(24)), IpError::NotFound);
    pass!()
}

pub fn test_route_add_then_delete_restores_table() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 2), IfIndex(0)));
    assert_ok!(table.add(v4(10, 1, 2, 0), mask(24), v4(192, 168, 1, 3), IfIndex(0)));
    assert_ok!(table.add(v4(10, 2, 0, 0), mask(16), v4(192, 168, 1, 4), IfIndex(1)));
    let before: Vec<RouteEntry> = table.entries().to_vec();

    // Head, two middle positions (one behind equal masks) and tail.
    let inserts = [
        (v4(10, 1, 2, 16), 28, 0),
        (v4(10, 3, 0, 0), 20, 1),
        (v4(10, 9, 0, 0), 16, 3),
        (v4(224, 0, 0, 0), 4, 4),
    ];
    for (network, prefix, position) in inserts {
        assert_eq_test!(
            assert_ok!(table.add(network, mask(prefix), v4(192, 168, 1, 9), IfIndex(0))),
            RouteUpdate::Inserted
        );
        assert_eq_test!(table.len(), before.len() + 1);
        assert_eq_test!(table.entries()[position].network, network);

        let removed = assert_ok!(table.delete(network, mask(prefix)));
        assert_eq_test!(removed.network, network);
        assert_eq_test!(table.entries(), &before[..], "add+delete leaves table unchanged");
    }
    pass!()
}

pub fn test_route_remove_interface() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 2, 0, 0), mask(16), v4(172, 16, 0, 1), IfIndex(1)));
    assert_ok!(table.add(v4(10, 3, 0, 0), mask(16), v4(192, 168, 1, 3), IfIndex(0)));

    assert_eq_test!(table.remove_interface(IfIndex(0)), 2);
    assert_eq_test!(table.len(), 1);
    assert_eq_test!(table.entries()[0].interface, IfIndex(1));
    pass!()
}

pub fn test_route_lookup_longest_prefix() -> TestResult {
    let mut table = StaticRouteTable::new();
    assert_ok!(table.add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1), IfIndex(0)));
    assert_ok!(table.add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 2), IfIndex(0)));

    let hit = table.lookup(v4(10, 1, 5, 5)).map(|e| e.next_hop);
    assert_eq_test!(hit, Some(v4(192, 168, 1, 2)));
    let hit = table.lookup(v4(10, 9, 5, 5)).map(|e| e.next_hop);
    assert_eq_test!(hit, Some(v4(192, 168, 1, 1)));
    assert_test!(table.lookup(v4(11, 0, 0, 1)).is_none());
    pass!()
}

pub fn test_static_route_add_binds_owner_interface() -> TestResult {
    let ip = instance(RecordingHooks::new());
    let (eth0, _) = attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    let (eth1, _) = attach(&ip, "eth1", v4(172, 16, 0, 10), 16);

    assert_ok!(ip.static_route_add(v4(10, 0, 0, 0), mask(8), v4(172, 16, 0, 1)));
    assert_ok!(ip.static_route_add(v4(10, 1, 0, 0), mask(16), v4(192, 168, 1, 1)));

    let routes = ip.static_routes();
    assert_eq_test!(routes.len(), 2);
    assert_eq_test!(routes[0].interface, eth0);
    assert_eq_test!(routes[1].interface, eth1);
    pass!()
}

pub fn test_static_route_add_rejects_unreachable_hop() -> TestResult {
    let ip = instance(RecordingHooks::new());
    attach(&ip, "eth0", v4(192, 168, 1, 10), 24);

    assert_err!(
        ip.static_route_add(v4(10, 0, 0, 0), mask(8), v4(8, 8, 8, 8)),
        IpError::AddressError
    );
    assert_test!(ip.static_routes().is_empty());
    pass!()
}

pub fn test_static_route_delete_through_instance() -> TestResult {
    let ip = instance(RecordingHooks::new());
    attach(&ip, "eth0", v4(192, 168, 1, 10), 24);
    assert_ok!(ip.static_route_add(v4(10, 0, 0, 0), mask(8), v4(192, 168, 1, 1)));

    assert_ok!(ip.static_route_delete(v4(10, 0, 0, 0), mask(8)));
    assert_err!(ip.static_route_delete(v4(10, 0, 0, 0), mask(8)), IpError::NotFound);
    pass!()
}

ipcore_lib::define_test_suite!(
    route,
    [
        test_route_add_sorts_by_mask,
        test_route_equal_masks_keep_insertion_order,
        test_route_add_masks_network,
        test_route_duplicate_updates_in_place,
        test_route_overflow,
        test_route_delete_shifts_entries,
        test_route_add_then_delete_restores_table,
        test_route_remove_interface,
        test_route_lookup_longest_prefix,
        test_static_route_add_binds_owner_interface,
        test_static_route_add_rejects_unreachable_hop,
        test_static_route_delete_through_instance,
    ]
);
