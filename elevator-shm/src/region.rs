//! The process-shared region itself: naming, creation/opening, mapping, and the
//! embedded mutex + condition variable (spec §4.3/§6). Grounded on the shared-memory
//! handle code in the teacher's IPC platform layer (`ShmHandle`/`NamedShmHandle`,
//! `shm_open`+`ftruncate`+`mmap` via `nix`), generalized to one fixed-layout named
//! region with process-shared synchronization primitives embedded as its first two
//! members.

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::num::NonZeroUsize;
use std::time::Duration;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::os::fd::AsFd;

use crate::error::ShmError;
use crate::payload::Payload;

/// Full region layout: mutex and condvar first, so they are valid before any payload
/// access, exactly as spec §6 requires.
#[repr(C)]
struct RawRegion {
    mutex: libc::pthread_mutex_t,
    cond: libc::pthread_cond_t,
    payload: Payload,
}

const REGION_SIZE: usize = std::mem::size_of::<RawRegion>();

fn shm_path(car_name: &str) -> Result<CString, ShmError> {
    if car_name.is_empty() || car_name.len() > elevator_proto::limits::MAX_CAR_NAME_LEN {
        return Err(ShmError::InvalidCarName(car_name.to_owned()));
    }
    CString::new(format!("/car{car_name}"))
        .map_err(|_| ShmError::InvalidCarName(car_name.to_owned()))
}

/// A mapped handle to one car's shared state region. Held by the car controller, the
/// safety monitor, and the internal-controls tool, all in separate processes.
pub struct CarRegion {
    ptr: *mut RawRegion,
    name: String,
    /// Whether this handle created the region (and is therefore responsible for
    /// unlinking it from the shared-memory namespace on drop).
    owner: bool,
}

// SAFETY: the pointer refers to a POSIX shared memory mapping guarded internally by
// a process-shared mutex; every access to the payload goes through `lock()`.
unsafe impl Send for CarRegion {}
unsafe impl Sync for CarRegion {}

impl CarRegion {
    /// Creates the region if it does not already exist, or opens it if another
    /// process (controller, monitor, or controls tool) created it first — spec §4.3's
    /// "created by whichever process opens the region first".
    pub fn create_or_open(car_name: &str) -> Result<CarRegion, ShmError> {
        let path = shm_path(car_name)?;
        match shm_open(
            path.as_c_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        ) {
            Ok(fd) => {
                ftruncate(&fd, REGION_SIZE as libc::off_t)?;
                let ptr = map(&fd)?;
                let region = CarRegion {
                    ptr,
                    name: car_name.to_owned(),
                    owner: true,
                };
                region.init_shared()?;
                Ok(region)
            }
            Err(nix::Error::EEXIST) => Self::open(car_name),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens a region that must already exist (used by the safety monitor and the
    /// internal-controls tool, which never create it themselves).
    pub fn open(car_name: &str) -> Result<CarRegion, ShmError> {
        let path = shm_path(car_name)?;
        let fd = shm_open(path.as_c_str(), OFlag::O_RDWR, Mode::empty())?;
        let ptr = map(&fd)?;
        Ok(CarRegion {
            ptr,
            name: car_name.to_owned(),
            owner: false,
        })
    }

    fn init_shared(&self) -> Result<(), ShmError> {
        unsafe {
            let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
            pthread_check(libc::pthread_mutexattr_init(attr.as_mut_ptr()))?;
            pthread_check(libc::pthread_mutexattr_setpshared(
                attr.as_mut_ptr(),
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            pthread_check(libc::pthread_mutex_init(
                &mut (*self.ptr).mutex,
                attr.as_ptr(),
            ))?;
            libc::pthread_mutexattr_destroy(attr.as_mut_ptr());

            let mut cattr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
            pthread_check(libc::pthread_condattr_init(cattr.as_mut_ptr()))?;
            pthread_check(libc::pthread_condattr_setpshared(
                cattr.as_mut_ptr(),
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            pthread_check(libc::pthread_cond_init(&mut (*self.ptr).cond, cattr.as_ptr()))?;
            libc::pthread_condattr_destroy(cattr.as_mut_ptr());

            (*self.ptr).payload.init_defaults();
        }
        Ok(())
    }

    /// Acquires the region's mutex and returns a guard giving synchronized access to
    /// the payload and to `broadcast`/`wait`.
    pub fn lock(&self) -> Result<RegionGuard<'_>, ShmError> {
        unsafe { pthread_check(libc::pthread_mutex_lock(&mut (*self.ptr).mutex))? };
        Ok(RegionGuard { region: self })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CarRegion {
    fn drop(&mut self) {
        unsafe {
            if let Some(addr) = std::ptr::NonNull::new(self.ptr as *mut libc::c_void) {
                let _ = munmap(addr, REGION_SIZE);
            }
        }
        if self.owner {
            if let Ok(path) = shm_path(&self.name) {
                let _ = shm_unlink(path.as_c_str());
            }
        }
    }
}

fn map(fd: &(impl AsFd + ?Sized)) -> Result<*mut RawRegion, ShmError> {
    let ptr = unsafe {
        mmap(
            None,
            NonZeroUsize::new(REGION_SIZE).expect("non-zero region size"),
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            MapFlags::MAP_SHARED,
            fd,
            0,
        )?
    };
    Ok(ptr.as_ptr() as *mut RawRegion)
}

fn pthread_check(rc: i32) -> Result<(), ShmError> {
    if rc == 0 {
        Ok(())
    } else {
        Err(ShmError::Pthread(rc))
    }
}

/// A held lock on the region's mutex. Dropping it unlocks.
pub struct RegionGuard<'a> {
    region: &'a CarRegion,
}

impl<'a> RegionGuard<'a> {
    pub fn payload(&self) -> &Payload {
        unsafe { &(*self.region.ptr).payload }
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        unsafe { &mut (*self.region.ptr).payload }
    }

    /// Broadcasts the condition variable; call after every observable write while
    /// still holding the lock (spec §4.3/§5).
    pub fn broadcast(&self) -> Result<(), ShmError> {
        unsafe { pthread_check(libc::pthread_cond_broadcast(&mut (*self.region.ptr).cond)) }
    }

    /// Waits on the condition variable, releasing the mutex while blocked and
    /// re-acquiring it before returning (spec §4.4: "acquire mutex; wait on the
    /// condition variable"). Spurious wakeups are possible; callers must recheck
    /// their predicate.
    pub fn wait(self) -> Result<RegionGuard<'a>, ShmError> {
        unsafe {
            pthread_check(libc::pthread_cond_wait(
                &mut (*self.region.ptr).cond,
                &mut (*self.region.ptr).mutex,
            ))?;
        }
        let region = self.region;
        std::mem::forget(self); // the mutex is still held; don't run our Drop's unlock
        Ok(RegionGuard { region })
    }

    /// Waits on the condition variable with a timeout, for the safety monitor's
    /// "interrupted waits retry, with brief back-off on failure" semantics.
    pub fn wait_timeout(self, timeout: Duration) -> Result<(RegionGuard<'a>, bool), ShmError> {
        let mut now = MaybeUninit::<libc::timespec>::uninit();
        unsafe {
            libc::clock_gettime(libc::CLOCK_REALTIME, now.as_mut_ptr());
        }
        let mut deadline = unsafe { now.assume_init() };
        deadline.tv_sec += timeout.as_secs() as libc::time_t;
        deadline.tv_nsec += timeout.subsec_nanos() as i64;
        if deadline.tv_nsec >= 1_000_000_000 {
            deadline.tv_sec += 1;
            deadline.tv_nsec -= 1_000_000_000;
        }

        let rc = unsafe {
            libc::pthread_cond_timedwait(
                &mut (*self.region.ptr).cond,
                &mut (*self.region.ptr).mutex,
                &deadline,
            )
        };
        match rc {
            0 => {
                let region = self.region;
                std::mem::forget(self); // the mutex is still held; don't run our Drop's unlock
                Ok((RegionGuard { region }, false))
            }
            libc::ETIMEDOUT => {
                let region = self.region;
                std::mem::forget(self); // the mutex is still held; don't run our Drop's unlock
                Ok((RegionGuard { region }, true))
            }
            // pthread_cond_timedwait left the mutex held on this path too; let
            // `self` drop normally here so its unlock runs, instead of forgetting
            // it, or the caller's escalate-and-retry would deadlock relocking.
            other => Err(ShmError::Pthread(other)),
        }
    }
}

impl<'a> Drop for RegionGuard<'a> {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::pthread_mutex_unlock(&mut (*self.region.ptr).mutex);
        }
    }
}
