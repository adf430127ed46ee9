// SPDX-License-Identifier: GPL-3.0-only

mod common;

use common::{SDB, SDC, SDD, assert_kind, devices, lab};
use storage_contracts::{PhysicalVolumeOps, StorageErrorKind, VolumeGroupOps};
use storage_types::PvState;
use storage_types::extent::MIB;

#[test]
fn create_uses_default_extent_size() {
    let lab = lab("2disk");
    lab.pvs.create(SDB).unwrap();
    lab.pvs.create(SDC).unwrap();

    lab.vgs.create("vg0", &devices(&[SDB, SDC]), 0).unwrap();
    assert_eq!(
        lab.last_mutation().as_deref(),
        Some("vgcreate -s 4194304b vg0 /dev/sdb /dev/sdc")
    );

    let vg = lab.vgs.info("vg0").unwrap();
    assert_eq!(vg.extent_size, 4 * MIB);
    assert_eq!(vg.extent_count, 256 + 128);
    assert_eq!(vg.free_count, vg.extent_count);
    assert_eq!(vg.pv_count, 2);
    assert_eq!(vg.lv_count, 0);
    assert!(vg.is_consistent());
}

#[test]
fn create_with_explicit_extent_size() {
    let lab = lab("2disk");
    lab.pvs.create(SDB).unwrap();

    lab.vgs.create("big", &devices(&[SDB]), 32 * MIB).unwrap();
    let vg = lab.vgs.info("big").unwrap();
    assert_eq!(vg.extent_size, 32 * MIB);
    assert_eq!(vg.extent_count, 32);
}

#[test]
fn create_rejects_bad_arguments_without_mutating() {
    let lab = lab("3disk");

    assert_kind(
        lab.vgs.create("vg1", &devices(&[SDD]), 3 * MIB),
        StorageErrorKind::Validation,
    );
    assert_kind(lab.vgs.create("vg1", &[], 0), StorageErrorKind::Validation);
    assert_kind(
        lab.vgs.create("vg1", &devices(&[SDD, SDD]), 0),
        StorageErrorKind::Validation,
    );
    assert_kind(
        lab.vgs.create("bad name", &devices(&[SDD]), 0),
        StorageErrorKind::Validation,
    );
    assert_kind(
        lab.vgs.create("-vg1", &devices(&[SDD]), 0),
        StorageErrorKind::Validation,
    );
    assert_kind(
        lab.vgs.create("vg1", &devices(&[SDB]), 0),
        StorageErrorKind::Validation,
    );
    assert_kind(
        lab.vgs.create("vg1", &devices(&["/dev/sdz"]), 0),
        StorageErrorKind::Validation,
    );
    assert_kind(
        lab.vgs.create("vg0", &devices(&[SDD]), 0),
        StorageErrorKind::AlreadyExists,
    );
    lab.assert_no_mutation();
}

#[test]
fn extend_with_foreign_pv_is_in_use() {
    let lab = lab("busy");
    let data = lab.vgs.info("data").unwrap();
    let scratch = lab.vgs.info("scratch").unwrap();

    assert_kind(lab.vgs.extend("scratch", SDB), StorageErrorKind::InUse);

    lab.assert_no_mutation();
    assert_eq!(lab.vgs.info("data").unwrap().extent_count, data.extent_count);
    assert_eq!(
        lab.vgs.info("scratch").unwrap().extent_count,
        scratch.extent_count
    );
    assert_eq!(
        lab.pvs.state(SDB).unwrap(),
        PvState::MemberOfVg("data".to_string())
    );
}

#[test]
fn extend_adds_capacity() {
    let lab = lab("3disk");

    lab.vgs.extend("vg0", SDD).unwrap();
    let vg = lab.vgs.info("vg0").unwrap();
    assert_eq!(vg.extent_count, 512 + 128);
    assert_eq!(vg.pv_count, 3);

    assert_kind(lab.vgs.extend("vg0", SDD), StorageErrorKind::Validation);
    assert_kind(lab.vgs.extend("ghost", SDD), StorageErrorKind::NotFound);
}

#[test]
fn extend_with_raw_device_is_rejected() {
    let lab = lab("2disk");
    lab.pvs.create(SDB).unwrap();
    lab.vgs.create("vg0", &devices(&[SDB]), 0).unwrap();
    lab.fake.ledger().clear();

    assert_kind(lab.vgs.extend("vg0", SDC), StorageErrorKind::Validation);
    lab.assert_no_mutation();
}

#[test]
fn remove_releases_members() {
    let lab = lab("3disk");

    lab.vgs.remove("vg0").unwrap();
    assert_eq!(lab.last_mutation().as_deref(), Some("vgremove --force vg0"));

    for device in [SDB, SDC] {
        assert_eq!(lab.pvs.state(device).unwrap(), PvState::Unassigned);
        let info = lab.pvs.info(Some(device)).unwrap();
        assert_eq!(info.vg_uuid, None);
        assert_eq!(info.vg_extent_count, 0);
    }
    assert_kind(lab.vgs.info("vg0"), StorageErrorKind::NotFound);
    assert!(lab.vgs.list().unwrap().is_empty());
}

#[test]
fn activation_toggles_group() {
    let lab = lab("3disk");

    lab.vgs.activate("vg0").unwrap();
    assert_eq!(lab.fake.is_active("vg0"), Some(true));
    assert_eq!(lab.last_mutation().as_deref(), Some("vgchange -ay vg0"));

    lab.vgs.deactivate("vg0").unwrap();
    assert_eq!(lab.fake.is_active("vg0"), Some(false));

    assert_kind(lab.vgs.activate("ghost"), StorageErrorKind::NotFound);
    assert_kind(lab.vgs.deactivate("ghost"), StorageErrorKind::NotFound);
}

#[test]
fn activate_twice_is_a_noop() {
    let lab = lab("3disk");

    lab.vgs.activate("vg0").unwrap();
    lab.vgs.activate("vg0").unwrap();
    assert_eq!(lab.fake.is_active("vg0"), Some(true));
    assert_eq!(lab.vgs.info("vg0").unwrap().extent_count, 512);
}

#[test]
fn deactivate_inactive_is_a_noop() {
    let lab = lab("3disk");
    assert_eq!(lab.fake.is_active("vg0"), Some(false));

    lab.vgs.deactivate("vg0").unwrap();
    lab.vgs.deactivate("vg0").unwrap();
    assert_eq!(lab.fake.is_active("vg0"), Some(false));
}

#[test]
fn names_with_lv_reserved_words_are_managed() {
    let lab = lab("snapshots");
    assert_eq!(lab.vgs.info("vg_snapshots").unwrap().pv_count, 1);

    lab.vgs.extend("vg_snapshots", SDC).unwrap();
    lab.vgs.activate("vg_snapshots").unwrap();
    lab.vgs.deactivate("vg_snapshots").unwrap();
    lab.vgs.reduce("vg_snapshots", SDC).unwrap();
    lab.vgs.remove("vg_snapshots").unwrap();

    assert!(!lab.fake.has_volume_group("vg_snapshots"));
    assert_eq!(lab.pvs.state(SDB).unwrap(), PvState::Unassigned);

    lab.vgs
        .create("pvmove_target", &devices(&[SDB, SDC]), 0)
        .unwrap();
    assert_eq!(lab.vgs.info("pvmove_target").unwrap().pv_count, 2);
}

#[test]
fn deactivating_open_volumes_is_in_use() {
    let lab = lab("busy");
    lab.vgs.activate("data").unwrap();

    let error = lab.vgs.deactivate("data").unwrap_err();
    assert_eq!(error.kind, StorageErrorKind::InUse);
    assert!(error.message.contains("in use"));
    assert_eq!(lab.fake.is_active("data"), Some(true));

    lab.fake.set_busy("data", false);
    lab.vgs.deactivate("data").unwrap();
    assert_eq!(lab.fake.is_active("data"), Some(false));
}

#[test]
fn other_vgchange_failures_stay_external() {
    let lab = lab("3disk");
    lab.fake
        .fail_next("vgchange", 5, "  Failed to activate: device-mapper error\n");

    assert_kind(lab.vgs.deactivate("vg0"), StorageErrorKind::ExternalTool);
}

#[test]
fn reduce_refuses_allocated_and_last_members() {
    let lab = lab("3disk");

    assert_kind(lab.vgs.reduce("vg0", SDB), StorageErrorKind::InUse);
    assert_kind(lab.vgs.reduce("vg0", SDD), StorageErrorKind::Validation);
    lab.assert_no_mutation();

    lab.vgs.reduce("vg0", SDC).unwrap();
    assert_eq!(lab.pvs.state(SDC).unwrap(), PvState::Unassigned);
    assert_eq!(lab.vgs.info("vg0").unwrap().pv_count, 1);

    let busy = common::lab("busy");
    assert_kind(busy.vgs.reduce("scratch", SDC), StorageErrorKind::Validation);
}

#[test]
fn list_is_sorted_by_name() {
    let lab = lab("busy");

    let names: Vec<_> = lab
        .vgs
        .list()
        .unwrap()
        .into_iter()
        .map(|vg| vg.name)
        .collect();
    assert_eq!(names, vec!["data", "scratch"]);
    assert_kind(lab.vgs.info("bad/name"), StorageErrorKind::Validation);
}
