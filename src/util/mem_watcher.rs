//! Resident-memory probe backing the `memory_limit_mb` ceiling.
use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result};

use nom::IResult;
use nom::Parser;
use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::map_res;
use nom::multi::count;
use nom::sequence::terminated;

/// Page counts read from `/proc/<pid>/statm`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statm {
    pub size: usize,
    pub resident: usize,
    pub share: usize,
    pub text: usize,
    pub data: usize,
}

pub type StatmProbe = fn() -> Result<Statm>;

/// Polled by the tree builder every `interval` nodes.
pub struct MemoryWatcher {
    limit_mb: u64,
    interval: usize,
    page_size: usize,
    probe: StatmProbe,
    init_resident: usize,
    max_resident: usize,
    disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryExceeded {
    pub resident_mb: u64,
    pub limit_mb: u64,
}

impl MemoryWatcher {
    pub fn new(limit_mb: u64, interval: usize) -> Self {
        Self::with_probe(limit_mb, interval, statm_self)
    }

    pub fn with_probe(limit_mb: u64, interval: usize, probe: StatmProbe) -> Self {
        let mut watcher = MemoryWatcher {
            limit_mb,
            interval: interval.max(1),
            page_size: page_size(),
            probe,
            init_resident: 0,
            max_resident: 0,
            disabled: false,
        };
        match probe() {
            Ok(statm) => {
                watcher.init_resident = statm.resident;
                watcher.max_resident = statm.resident;
            }
            Err(err) => watcher.disable(&err),
        }
        watcher
    }

    fn disable(&mut self, err: &Error) {
        log::warn!(
            "memory probe unavailable ({}), memory ceiling of {} MB is disabled",
            err,
            self.limit_mb
        );
        self.disabled = true;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Samples resident memory when `explored` is a multiple of the interval.
    pub fn poll(&mut self, explored: usize) -> std::result::Result<(), MemoryExceeded> {
        if self.disabled || explored % self.interval != 0 {
            return Ok(());
        }
        let statm = match (self.probe)() {
            Ok(statm) => statm,
            Err(err) => {
                self.disable(&err);
                return Ok(());
            }
        };
        self.max_resident = self.max_resident.max(statm.resident);

        let resident_mb = self.pages_in_megabytes(statm.resident);
        if resident_mb > self.limit_mb {
            return Err(MemoryExceeded {
                resident_mb,
                limit_mb: self.limit_mb,
            });
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        if self.disabled {
            return;
        }
        log::info!(
            "Used Memory Before Analysis: {} MB",
            self.pages_in_megabytes(self.init_resident)
        );
        log::info!(
            "Max Memory in Analysis: {} MB",
            self.pages_in_megabytes(self.max_resident)
        );
    }

    fn pages_in_megabytes(&self, pages: usize) -> u64 {
        (pages as u64 * self.page_size as u64) / (1024 * 1024)
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

pub fn map_result<T>(result: IResult<&str, T>) -> Result<T> {
    match result {
        IResult::Ok((remaining, val)) => {
            if remaining.is_empty() {
                Ok(val)
            } else {
                Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("unable to parse whole input, remaining: {:?}", remaining),
                ))
            }
        }
        IResult::Err(err) => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unable to parse input: {:?}", err),
        )),
    }
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>()).parse(input)
}

fn parse_statm(input: &str) -> IResult<&str, Statm> {
    (count(terminated(parse_usize, tag(" ")), 6), parse_usize)
        .parse(input)
        .map(|(next_input, res)| {
            let statm = Statm {
                size: res.0[0],
                resident: res.0[1],
                share: res.0[2],
                text: res.0[3],
                data: res.0[5],
            };
            (next_input, statm)
        })
}

fn statm_file(file: &mut File) -> Result<Statm> {
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    map_result(parse_statm(buf.trim()))
}

pub fn statm_self() -> Result<Statm> {
    statm_file(&mut File::open("/proc/self/statm")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_statm_line() {
        let statm = map_result(parse_statm("2048 512 128 16 0 256 0")).unwrap();
        assert_eq!(
            statm,
            Statm {
                size: 2048,
                resident: 512,
                share: 128,
                text: 16,
                data: 256,
            }
        );
        assert!(map_result(parse_statm("1 2 3")).is_err());
    }

    fn huge() -> Result<Statm> {
        Ok(Statm {
            resident: usize::MAX / 1_000_000,
            ..Statm::default()
        })
    }

    fn missing() -> Result<Statm> {
        Err(Error::new(ErrorKind::NotFound, "no procfs"))
    }

    #[test]
    fn ceiling_is_checked_on_interval() {
        let mut watcher = MemoryWatcher::with_probe(1, 4, huge);
        assert!(watcher.poll(3).is_ok());
        let exceeded = watcher.poll(8).unwrap_err();
        assert_eq!(exceeded.limit_mb, 1);
        assert!(exceeded.resident_mb > 1);
    }

    #[test]
    fn missing_probe_disables_ceiling() {
        let mut watcher = MemoryWatcher::with_probe(1, 1, missing);
        assert!(watcher.is_disabled());
        assert!(watcher.poll(1).is_ok());
    }
}
