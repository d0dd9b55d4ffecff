//! Code-to-data cross-reference discovery (`spec.md` §4.2).
//!
//! Scans executable section bytes for three fixed instruction shapes whose
//! operand resolves to a virtual address: `lea` (32- and 64-bit), and
//! immediate `mov`/`push` (32-bit only, where absolute addressing is
//! common). This is not a disassembly engine in its own right — it drives
//! `iced-x86`'s decoder and only ever inspects three mnemonics, the same
//! way `necauqua-noita-utility-box`'s `ExeImage::decode_fn` drives the same
//! decoder to recognize a fixed `push` shape.

use iced_x86::{Decoder, DecoderOptions, Instruction, Mnemonic, OpKind, Register};
use log::warn;

use crate::model::{Machine, Xref};

fn is_immediate_kind(kind: OpKind) -> bool {
    matches!(
        kind,
        OpKind::Immediate8
            | OpKind::Immediate16
            | OpKind::Immediate32
            | OpKind::Immediate64
            | OpKind::Immediate8to16
            | OpKind::Immediate8to32
            | OpKind::Immediate8to64
            | OpKind::Immediate32to64
    )
}

fn immediate_operands(instr: &Instruction) -> impl Iterator<Item = u64> + '_ {
    (0..instr.op_count()).filter_map(move |i| {
        let kind = instr.op_kind(i);
        is_immediate_kind(kind).then(|| instr.immediate(i))
    })
}

/// Resolve the VA an `lea`'s memory operand targets, if it can be resolved
/// without a base/index register (absolute addressing, or RIP-relative on
/// x64).
fn lea_target(instr: &Instruction) -> Option<u64> {
    if instr.is_ip_rel_memory_operand() {
        return Some(instr.ip_rel_memory_address());
    }
    if instr.memory_base() == Register::None && instr.memory_index() == Register::None {
        let disp = instr.memory_displacement64();
        if disp != 0 {
            return Some(disp);
        }
    }
    None
}

fn decode(bitness: u32, code: &[u8], base_va: u64) -> Decoder<'_> {
    Decoder::with_ip(bitness, code, base_va, DecoderOptions::NONE)
}

/// Find every `lea` whose memory operand resolves to a fixed VA. Valid on
/// both 32- and 64-bit x86.
pub fn find_lea_xrefs(machine: Machine, code: &[u8], base_va: u64) -> Vec<Xref> {
    let bitness = match machine {
        Machine::X86 => 32,
        Machine::X64 => 64,
        Machine::Unsupported(_) => return Vec::new(),
    };
    decode(bitness, code, base_va)
        .into_iter()
        .filter(|instr| instr.mnemonic() == Mnemonic::Lea)
        .filter_map(|instr| lea_target(&instr))
        .map(|target_va| Xref { target_va })
        .collect()
}

/// Find every `mov` with an immediate source operand. 32-bit PEs only
/// (`spec.md` §4.2).
pub fn find_mov_xrefs(machine: Machine, code: &[u8], base_va: u64) -> Vec<Xref> {
    if machine != Machine::X86 {
        return Vec::new();
    }
    decode(32, code, base_va)
        .into_iter()
        .filter(|instr| instr.mnemonic() == Mnemonic::Mov)
        .flat_map(|instr| immediate_operands(&instr).collect::<Vec<_>>())
        .map(|target_va| Xref { target_va })
        .collect()
}

/// Find every `push` with an immediate operand. 32-bit PEs only
/// (`spec.md` §4.2).
pub fn find_push_xrefs(machine: Machine, code: &[u8], base_va: u64) -> Vec<Xref> {
    if machine != Machine::X86 {
        return Vec::new();
    }
    decode(32, code, base_va)
        .into_iter()
        .filter(|instr| instr.mnemonic() == Mnemonic::Push)
        .flat_map(|instr| immediate_operands(&instr).collect::<Vec<_>>())
        .map(|target_va| Xref { target_va })
        .collect()
}

/// Union of the xref families appropriate for `machine`, per `spec.md`
/// §4.4's architecture gate: 32-bit gets LEA+MOV+PUSH, 64-bit gets LEA
/// only, anything else gets nothing and a warning.
pub fn find_xrefs(machine: Machine, code: &[u8], base_va: u64) -> Vec<Xref> {
    match machine {
        Machine::X86 => {
            let mut xrefs = find_lea_xrefs(machine, code, base_va);
            xrefs.extend(find_mov_xrefs(machine, code, base_va));
            xrefs.extend(find_push_xrefs(machine, code, base_va));
            xrefs
        }
        Machine::X64 => find_lea_xrefs(machine, code, base_va),
        Machine::Unsupported(raw) => {
            warn!("unsupported machine type for xref harvesting: {raw:#x}");
            Vec::new()
        }
    }
}
