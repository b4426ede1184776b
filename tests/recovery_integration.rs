//! Integration tests for crash recovery against a pre-populated store.

mod common;

use fleet_sim::sim::recover;
use fleet_sim::store::{DeviceId, PowerState};

use common::{fleet, record};

#[test]
fn active_record_is_restored_without_turning_on() {
    let f = fleet(vec![record("d1", PowerState::Active, "Lamp")]);
    let id = DeviceId::from("d1");

    let report = recover(&f.lifecycle).expect("recover");
    assert_eq!(report.restored, 1);
    assert!(f.registry().contains(&id));
    assert_eq!(f.lifecycle.power_state(&id).expect("state"), PowerState::Active);

    f.tick(1);
    let m = f.lifecycle.get_measurements(&id).expect("simulating");
    assert!(!m.powered_on);
    assert_eq!(m.power_w, 0.0);
}

#[test]
fn on_record_resumes_drawing_power() {
    let f = fleet(vec![record("d1", PowerState::On, "Lamp")]);
    let id = DeviceId::from("d1");
    recover(&f.lifecycle).expect("recover");
    f.tick(1);
    assert!(f.lifecycle.get_measurements(&id).expect("simulating").power_w > 0.0);
    assert!(f.lifecycle.is_on(&id).expect("state"));
}

#[test]
fn second_run_leaves_registry_identical() {
    let f = fleet(vec![
        record("a", PowerState::Active, "Lamp"),
        record("b", PowerState::On, "Heater"),
        record("c", PowerState::Off, "Fridge"),
        record("d", PowerState::Inactive, "Lamp"),
    ]);

    recover(&f.lifecycle).expect("first pass");
    let ids = f.registry().snapshot_ids();
    let handles: Vec<_> = ids.iter().filter_map(|id| f.registry().get(id)).collect();

    let report = recover(&f.lifecycle).expect("second pass");
    assert_eq!(report.restored, 0);
    assert_eq!(f.registry().snapshot_ids(), ids);
    for h in &handles {
        let current = f.registry().get(h.device_id()).expect("still present");
        assert!(std::sync::Arc::ptr_eq(h, &current));
    }
    assert_eq!(ids.len(), 3);
    assert_eq!(f.lifecycle.interrupted_simulations().expect("count"), 0);
}

#[test]
fn stop_all_then_recover_restores_same_set() {
    let f = fleet(vec![
        record("a", PowerState::On, "Lamp"),
        record("b", PowerState::Off, "Lamp"),
    ]);
    recover(&f.lifecycle).expect("recover");
    let before = f.registry().snapshot_ids();

    assert_eq!(f.lifecycle.stop_all(), 2);
    assert_eq!(f.lifecycle.interrupted_simulations().expect("count"), 2);

    recover(&f.lifecycle).expect("recover again");
    assert_eq!(f.registry().snapshot_ids(), before);
}
