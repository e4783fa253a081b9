//! Create-on-enter, destroy-on-exit usage.

use std::ops::{Deref, DerefMut};

use snapvm_remote::CommandRunner;

use crate::{VirtualMachine, VmError};

/// A created machine that is destroyed when the guard goes out of scope,
/// including while unwinding from a panic.
#[derive(Debug)]
pub struct ScopedVm<R: CommandRunner> {
    vm: VirtualMachine<R>,
}

impl<R: CommandRunner> Deref for ScopedVm<R> {
    type Target = VirtualMachine<R>;

    fn deref(&self) -> &Self::Target {
        &self.vm
    }
}

impl<R: CommandRunner> DerefMut for ScopedVm<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vm
    }
}

impl<R: CommandRunner> Drop for ScopedVm<R> {
    fn drop(&mut self) {
        self.vm.destroy();
    }
}

impl<R: CommandRunner> VirtualMachine<R> {
    /// Create the machine and tie its lifetime to the returned guard.
    pub fn scoped(mut self) -> Result<ScopedVm<R>, VmError> {
        self.create()?;
        Ok(ScopedVm { vm: self })
    }

    /// Create the machine, run `f` against it, then destroy it whatever `f`
    /// returned.
    pub fn with<T, E, F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut VirtualMachine<R>) -> Result<T, E>,
        E: From<VmError>,
    {
        let mut vm = self.scoped()?;
        f(&mut *vm)
    }
}
