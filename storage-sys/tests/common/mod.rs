// SPDX-License-Identifier: GPL-3.0-only

#![allow(dead_code)]

use std::sync::Arc;

use storage_contracts::{StorageErrorKind, StorageResult};
use storage_sys::{LvmConfig, PvManager, VgManager, managers};
use storage_testing::FakeLvm;

pub const SDB: &str = "/dev/sdb";
pub const SDC: &str = "/dev/sdc";
pub const SDD: &str = "/dev/sdd";

pub struct Lab {
    pub fake: Arc<FakeLvm>,
    pub pvs: PvManager,
    pub vgs: VgManager,
}

pub fn lab(spec_name: &str) -> Lab {
    lab_with_config(spec_name, LvmConfig::default())
}

pub fn lab_with_config(spec_name: &str, config: LvmConfig) -> Lab {
    let fake = Arc::new(storage_testing::load_fake(spec_name).expect("load lab spec"));
    let (pvs, vgs) = managers(fake.clone(), config);
    Lab { fake, pvs, vgs }
}

pub fn devices(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|path| path.to_string()).collect()
}

#[track_caller]
pub fn assert_kind<T: std::fmt::Debug>(result: StorageResult<T>, kind: StorageErrorKind) {
    match result {
        Ok(value) => panic!("expected {kind:?}, got Ok({value:?})"),
        Err(error) => assert_eq!(error.kind, kind, "unexpected error: {error}"),
    }
}

impl Lab {
    #[track_caller]
    pub fn assert_no_mutation(&self) {
        let mutating = self.fake.ledger().mutating();
        assert!(
            mutating.is_empty(),
            "unexpected mutating commands: {:?}",
            mutating.iter().map(|entry| entry.rendered()).collect::<Vec<_>>()
        );
    }

    pub fn last_mutation(&self) -> Option<String> {
        self.fake
            .ledger()
            .mutating()
            .last()
            .map(|entry| entry.rendered())
    }
}
