//! Exception-handling metadata: Windows SEH unwind tables and `FuncInfo`
//! for MSVC targets, `.eh_frame`/LSDA for Itanium targets. Consumes the
//! `EhMarkerEntry` stream `cxx-codegen` records while encoding a function.

use thiserror::Error;

pub mod itanium;
pub mod seh;

pub use itanium::{ActionEntry, CallSiteEntry, ItaniumTypeInfoKind, Lsda, write_eh_frame_for_functions};
pub use seh::{
    encode_ip_to_state_map, encode_try_block_map, layout_for, FuncInfo, FuncInfoLayout, HandlerEntry,
    IpToStateEntry, ScopeTableEntry, SehStateBuilder, TryBlockMapEntry, FUNC_INFO_LAYOUTS, FUNC_INFO_MAGIC,
};

#[derive(Error, Debug)]
pub enum EhError {
    #[error("failed to write DWARF call-frame data: {0}")]
    DwarfWrite(String),
    #[error("a try-scope was left open at the end of a function")]
    UnbalancedTryScope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_codegen::{EhMarker, EhMarkerEntry};

    #[test]
    fn a_single_try_catch_produces_one_try_block() {
        let markers = vec![
            EhMarkerEntry { code_offset: 0, marker: EhMarker::SehTryBegin },
            EhMarkerEntry { code_offset: 10, marker: EhMarker::SehExceptBegin },
            EhMarkerEntry { code_offset: 20, marker: EhMarker::SehTryEnd },
        ];
        let (try_blocks, ip_to_state) = SehStateBuilder::new().build(&markers);
        assert_eq!(try_blocks.len(), 1);
        assert_eq!(try_blocks[0].try_low, 0);
        assert!(ip_to_state.iter().any(|e| e.state == 0));
        assert!(ip_to_state.iter().any(|e| e.state == -1));
    }

    #[test]
    fn nested_try_scopes_get_increasing_states() {
        let markers = vec![
            EhMarkerEntry { code_offset: 0, marker: EhMarker::SehTryBegin },
            EhMarkerEntry { code_offset: 5, marker: EhMarker::SehTryBegin },
            EhMarkerEntry { code_offset: 10, marker: EhMarker::SehTryEnd },
            EhMarkerEntry { code_offset: 15, marker: EhMarker::SehTryEnd },
        ];
        let (try_blocks, _) = SehStateBuilder::new().build(&markers);
        assert_eq!(try_blocks.len(), 2);
        assert_ne!(try_blocks[0].try_low, try_blocks[1].try_low);
    }

    #[test]
    fn frame_offset_nibble_caps_at_fifteen() {
        assert_eq!(seh::frame_offset_nibble(16), 1);
        assert_eq!(seh::frame_offset_nibble(16 * 20), 15);
    }
}
