//! The tightstring engine (`spec.md` §4.5): drives an injected emulator
//! through a function, snapshots the stack at the entry and exit of
//! pre-identified tight loops, and diffs the two snapshots to isolate
//! strings a loop materialized byte-by-byte.
//!
//! The driver/monitor relationship is modeled as a trait rather than an
//! inheritance hierarchy (`spec.md` §9, "Monitor/driver inheritance"):
//! [`TightstringMonitor`] *contains* the pre-context capture bookkeeping
//! rather than extending some separate stackstring-monitor type.

use std::collections::BTreeSet;

use crate::config::{DriverLimits, ExtractionConfig};
use crate::error::Result;
use crate::fp_filter;
use crate::model::{CallContext, StringEncoding, TightString};
use crate::scanner::StringScanner;

/// One tight loop inside a function: the VA its body starts at and the VA
/// control reaches on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TightLoopRange {
    pub startva: u64,
    pub endva: u64,
}

/// The emulator seam (`spec.md` §6). floss-core does not implement a CPU
/// emulator; this is the shape a real one is adapted to.
pub trait Emulator {
    fn program_counter(&self) -> u64;
    fn stack_pointer(&self) -> u64;
    fn initial_stack_pointer(&self) -> u64;

    /// Read stack memory in `[from, to)`. `from` is expected to be `<= to`.
    fn read_stack(&self, from: u64, to: u64) -> Result<Vec<u8>>;
}

/// Pointer size and other per-workspace facts the engine needs (`spec.md`
/// §6). A real workspace exposes much more (function lists, imports,
/// `get_file_by_va`); only what this engine consumes is modeled here.
pub trait Workspace {
    fn pointer_size(&self) -> u64;
}

/// Callbacks a `Driver` invokes while running a function (`spec.md` §6).
pub trait DriverMonitor {
    fn prehook(&mut self, emu: &dyn Emulator, pc: u64);
    fn posthook(&mut self, emu: &dyn Emulator, pc: u64);

    /// Not used by the tightstring monitor; default no-op per `spec.md` §6.
    fn apicall(&mut self, _emu: &dyn Emulator, _pc: u64, _api: &str, _argv: &[u64]) {}
}

/// Drives a function's emulation, invoking `monitor`'s hooks around every
/// instruction, bounded by `limits` (`spec.md` §5: `maxhit`/`maxrep` exist to
/// guarantee termination on pathological loops).
pub trait Driver {
    fn run_function(&mut self, fva: u64, monitor: &mut dyn DriverMonitor, limits: DriverLimits);
}

fn capture_context(emu: &dyn Emulator) -> Result<CallContext> {
    let sp = emu.stack_pointer();
    let init_sp = emu.initial_stack_pointer();
    let stack_memory = emu.read_stack(sp, init_sp)?;
    Ok(CallContext {
        program_counter: emu.program_counter(),
        stack_pointer: sp,
        initial_stack_pointer: init_sp,
        stack_memory,
    })
}

/// Monitor for one function's emulation run. Owns the two derived sets from
/// `spec.md` §4.5 step 1, the running pre-context exclusion set, and the
/// list of captured post-contexts.
struct TightstringMonitor<'a> {
    scanner: &'a dyn StringScanner,
    min_length: usize,
    pre_startvas: BTreeSet<u64>,
    pending_endvas: BTreeSet<u64>,
    pre_ctx_strings: BTreeSet<String>,
    post_contexts: Vec<CallContext>,
}

impl<'a> TightstringMonitor<'a> {
    fn new(loops: &[TightLoopRange], scanner: &'a dyn StringScanner, min_length: usize) -> Self {
        TightstringMonitor {
            scanner,
            min_length,
            pre_startvas: loops.iter().map(|r| r.startva).collect(),
            pending_endvas: loops.iter().map(|r| r.endva).collect(),
            pre_ctx_strings: BTreeSet::new(),
            post_contexts: Vec::new(),
        }
    }
}

impl DriverMonitor for TightstringMonitor<'_> {
    fn prehook(&mut self, emu: &dyn Emulator, pc: u64) {
        if !self.pre_startvas.remove(&pc) {
            return;
        }
        let ctx = match capture_context(emu) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::debug!("tightstring prehook at {pc:#x}: {e}");
                return;
            }
        };
        self.pre_ctx_strings
            .extend(self.scanner.ascii(&ctx.stack_memory, self.min_length));
        self.pre_ctx_strings
            .extend(self.scanner.utf16(&ctx.stack_memory, self.min_length));
    }

    fn posthook(&mut self, emu: &dyn Emulator, pc: u64) {
        if !self.pending_endvas.remove(&pc) {
            return;
        }
        match capture_context(emu) {
            Ok(ctx) => self.post_contexts.push(ctx),
            Err(e) => log::debug!("tightstring posthook at {pc:#x}: {e}"),
        }
    }
}

/// Diff one post-loop context against the running exclusion set, yielding
/// the `TightString`s it contributes (`spec.md` §4.5 step 5).
fn diff_context(
    ctx: &CallContext,
    exclude: &mut BTreeSet<String>,
    scanner: &dyn StringScanner,
    function_va: u64,
    min_length: usize,
    pointer_size: u64,
) -> Vec<TightString> {
    let mut out = Vec::new();
    for r in scanner.scan(&ctx.stack_memory, min_length) {
        if exclude.contains(&r.text) {
            continue;
        }
        if let Some(stripped) = fp_filter::filter(&r.text, min_length) {
            let stack_offset = r.start as u64;
            let frame_offset = TightString::frame_offset(
                ctx.initial_stack_pointer,
                ctx.stack_pointer,
                stack_offset,
                pointer_size,
            );
            out.push(TightString {
                function_va,
                bytes: stripped.clone(),
                encoding: StringEncoding::from(r.encoding),
                program_counter: ctx.program_counter,
                stack_pointer: ctx.stack_pointer,
                initial_stack_pointer: ctx.initial_stack_pointer,
                stack_offset,
                frame_offset,
            });
            exclude.insert(stripped);
        }
    }
    out
}

/// Extract tightstrings from one function's tight loops (`spec.md` §4.5).
pub fn extract_for_function(
    driver: &mut dyn Driver,
    workspace: &dyn Workspace,
    function_va: u64,
    loops: &[TightLoopRange],
    config: &ExtractionConfig,
    limits: DriverLimits,
    scanner: &dyn StringScanner,
) -> Vec<TightString> {
    if loops.is_empty() {
        return Vec::new();
    }

    let mut monitor = TightstringMonitor::new(loops, scanner, config.min_length);
    driver.run_function(function_va, &mut monitor, limits);

    let pointer_size = workspace.pointer_size();
    let mut exclude = monitor.pre_ctx_strings.clone();
    let mut out = Vec::new();
    for ctx in &monitor.post_contexts {
        out.extend(diff_context(
            ctx,
            &mut exclude,
            scanner,
            function_va,
            config.min_length,
            pointer_size,
        ));
    }

    if out.is_empty() && !monitor.post_contexts.is_empty() {
        log::debug!("function {function_va:#x} yielded no tightstrings past filtering");
    }
    out
}

/// Extract tightstrings across every function in `functions` (`fva -> tight
/// loops`). Functions are independent; `spec.md` §5 leaves parallelizing
/// this loop to the caller.
pub fn extract<F>(
    workspace: &dyn Workspace,
    functions: impl IntoIterator<Item = (u64, Vec<TightLoopRange>)>,
    config: &ExtractionConfig,
    limits: DriverLimits,
    scanner: &dyn StringScanner,
    mut make_driver: F,
) -> Vec<TightString>
where
    F: FnMut() -> Box<dyn Driver>,
{
    functions
        .into_iter()
        .flat_map(|(fva, loops)| {
            let mut driver = make_driver();
            extract_for_function(
                driver.as_mut(),
                workspace,
                fva,
                &loops,
                config,
                limits,
                scanner,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::test_support::DefaultStringScanner;

    struct FakeWorkspace {
        pointer_size: u64,
    }

    impl Workspace for FakeWorkspace {
        fn pointer_size(&self) -> u64 {
            self.pointer_size
        }
    }

    /// A driver that plays back a fixed instruction trace against a fixed
    /// stack buffer, calling `prehook`/`posthook` as it goes.
    struct ScriptedDriver {
        trace: Vec<u64>,
        sp: u64,
        initial_sp: u64,
        stack_memory: Vec<u8>,
    }

    struct FixedEmulator<'a> {
        pc: u64,
        sp: u64,
        initial_sp: u64,
        stack_memory: &'a [u8],
    }

    impl Emulator for FixedEmulator<'_> {
        fn program_counter(&self) -> u64 {
            self.pc
        }
        fn stack_pointer(&self) -> u64 {
            self.sp
        }
        fn initial_stack_pointer(&self) -> u64 {
            self.initial_sp
        }
        fn read_stack(&self, _from: u64, _to: u64) -> Result<Vec<u8>> {
            Ok(self.stack_memory.to_vec())
        }
    }

    impl Driver for ScriptedDriver {
        fn run_function(&mut self, _fva: u64, monitor: &mut dyn DriverMonitor, _limits: DriverLimits) {
            for &pc in &self.trace {
                let emu = FixedEmulator {
                    pc,
                    sp: self.sp,
                    initial_sp: self.initial_sp,
                    stack_memory: &self.stack_memory,
                };
                monitor.prehook(&emu, pc);
                monitor.posthook(&emu, pc);
            }
        }
    }

    #[test]
    fn excludes_preloop_strings_from_output() {
        // spec.md §8 scenario 6: pre-loop stack has "SECRET"; post-loop
        // stack has "SECRET" and "PASS"; only "PASS" should survive.
        let scanner = DefaultStringScanner;
        let workspace = FakeWorkspace { pointer_size: 8 };

        let pre_stack = b"\x00\x00SECRET\x00\x00".to_vec();
        let post_stack = b"\x00\x00SECRET\x00\x00PASS\x00\x00".to_vec();

        let loops = vec![TightLoopRange {
            startva: 0x1000,
            endva: 0x1010,
        }];

        let mut driver = ScriptedDriver {
            trace: vec![0x1000],
            sp: 0x2000,
            initial_sp: 0x3000,
            stack_memory: pre_stack,
        };
        let config = ExtractionConfig::new(4);
        let limits = DriverLimits::default();

        // first pass: drive the prehook with the pre-loop stack
        let mut monitor = TightstringMonitor::new(&loops, &scanner, config.min_length);
        driver.run_function(0x100, &mut monitor, limits);
        assert!(monitor.pre_ctx_strings.contains("SECRET"));

        // now feed the post-loop stack directly through posthook via a
        // second scripted driver sharing the same monitor semantics
        driver.stack_memory = post_stack;
        driver.trace = vec![0x1010];
        driver.run_function(0x100, &mut monitor, limits);

        assert_eq!(monitor.post_contexts.len(), 1);
        let mut exclude = monitor.pre_ctx_strings.clone();
        let out = diff_context(
            &monitor.post_contexts[0],
            &mut exclude,
            &scanner,
            0x100,
            config.min_length,
            workspace.pointer_size(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, "PASS");
    }

    #[test]
    fn empty_loop_list_yields_nothing() {
        let scanner = DefaultStringScanner;
        let workspace = FakeWorkspace { pointer_size: 4 };
        let mut driver = ScriptedDriver {
            trace: vec![],
            sp: 0,
            initial_sp: 0,
            stack_memory: vec![],
        };
        let out = extract_for_function(
            &mut driver,
            &workspace,
            0x100,
            &[],
            &ExtractionConfig::default(),
            DriverLimits::default(),
            &scanner,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn one_capture_per_loop() {
        // entering the same startva twice should only materialize one
        // pre-context (spec.md §9, "Open question").
        let scanner = DefaultStringScanner;
        let loops = vec![TightLoopRange {
            startva: 0x1000,
            endva: 0x1010,
        }];
        let mut monitor = TightstringMonitor::new(&loops, &scanner, 4);
        let stack = b"\x00\x00HELLO\x00\x00".to_vec();
        for _ in 0..2 {
            let emu = FixedEmulator {
                pc: 0x1000,
                sp: 0x2000,
                initial_sp: 0x3000,
                stack_memory: &stack,
            };
            monitor.prehook(&emu, 0x1000);
        }
        assert!(monitor.pre_startvas.is_empty());
        assert!(monitor.pre_ctx_strings.contains("HELLO"));
    }
}
