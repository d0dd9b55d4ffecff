//! The PE accessor trait floss-core is driven through.
//!
//! PE parsing itself is out of scope for this crate (`spec.md` §1 names it
//! an external collaborator); `PeImage` is the seam a real parser plugs
//! into. `m4b-goblin`'s own `pe::PE` is the kind of concrete type a caller
//! would adapt to this trait.

pub mod utils;

use crate::model::{Machine, SectionView};

/// Everything floss-core needs out of a parsed PE image.
pub trait PeImage {
    /// The image's preferred load address.
    fn image_base(&self) -> u64;

    /// The image's machine type.
    fn machine(&self) -> Machine;

    /// Look up a section by name (e.g. `"rdata"`, `"text"`), without the
    /// leading dot. Returns `None` if the section is absent.
    fn section(&self, name: &str) -> Option<SectionView>;

    /// All executable sections' raw bytes paired with the VA their first
    /// byte loads at. The xref harvester scans these for LEA/MOV/PUSH
    /// immediates pointing into `.rdata`.
    fn executable_sections(&self) -> Vec<(u64, Vec<u8>)>;
}

/// Fetch the `.rdata` section, logging and returning `None` if absent
/// (`spec.md` §7: `NoRdata` is never fatal).
pub fn get_rdata_section(pe: &dyn PeImage) -> Option<SectionView> {
    match pe.section("rdata") {
        Some(section) => Some(section),
        None => {
            log::error!("cannot extract strings: PE image has no .rdata section");
            None
        }
    }
}
