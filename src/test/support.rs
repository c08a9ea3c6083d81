//! Shared test doubles: a close-counting screen and a scriptable driver.

use std::fs::File;
use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use snafu::ResultExt;

use crate::error::{ConstructionSnafu, DeviceOpenSnafu, Result};
use crate::identity::DeviceIdentity;
use crate::probe::Driver;
use crate::registry::Screen;

/// Screen that records its selected core and counts teardowns.
#[derive(Debug)]
pub struct MockScreen {
    pub serial: usize,
    pub core_index: u32,
    closes: Arc<AtomicUsize>,
}

impl MockScreen {
    pub fn new(serial: usize, core_index: u32, closes: Arc<AtomicUsize>) -> Self {
        Self { serial, core_index, closes }
    }
}

impl Screen for MockScreen {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Constructor closure body for registry tests.
pub fn construct(serial: usize, closes: &Arc<AtomicUsize>) -> Result<Arc<dyn Screen>> {
    Ok(Arc::new(MockScreen::new(serial, 0, Arc::clone(closes))))
}

/// Synthetic identity for registry tests that never touch an fd.
pub fn ident(n: u64) -> DeviceIdentity {
    DeviceIdentity::from_raw(n, n + 100, 0)
}

/// An owned fd the mock driver can take ownership of.
pub fn devnull_fd() -> OwnedFd {
    OwnedFd::from(File::open("/dev/null").expect("open /dev/null"))
}

/// Driver whose per-index core capability masks are scripted.
///
/// Enumeration ends once the scripted masks run out.
pub struct MockDriver {
    flags: Vec<u64>,
    pub fail_open: bool,
    pub fail_create: bool,
    pub flags_error_at: Option<u32>,
    pub closed_cores: AtomicUsize,
    pub created: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl MockDriver {
    pub fn new(flags: &[u64]) -> Self {
        Self {
            flags: flags.to_vec(),
            fail_open: false,
            fail_create: false,
            flags_error_at: None,
            closed_cores: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

pub struct MockDevice {
    _fd: OwnedFd,
}

pub struct MockCore {
    index: u32,
}

impl Driver for MockDriver {
    type Device = MockDevice;
    type Core = MockCore;
    type Screen = MockScreen;

    fn open_device(&self, fd: OwnedFd) -> Result<MockDevice> {
        if self.fail_open {
            return Err(std::io::Error::other("open refused")).context(DeviceOpenSnafu { device: "mock" });
        }
        Ok(MockDevice { _fd: fd })
    }

    fn open_core(&self, _device: &MockDevice, index: u32) -> Option<MockCore> {
        (usize::try_from(index).unwrap() < self.flags.len()).then_some(MockCore { index })
    }

    fn core_flags(&self, core: &MockCore) -> Result<u64> {
        if self.flags_error_at == Some(core.index) {
            return ConstructionSnafu { reason: "capability query failed" }.fail();
        }
        Ok(self.flags[core.index as usize])
    }

    fn close_core(&self, _core: MockCore) {
        self.closed_cores.fetch_add(1, Ordering::SeqCst);
    }

    fn create_screen(&self, _device: MockDevice, core: MockCore) -> Result<MockScreen> {
        if self.fail_create {
            return ConstructionSnafu { reason: "constructor refused" }.fail();
        }
        let serial = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockScreen::new(serial, core.index, Arc::clone(&self.closes)))
    }
}
