//! Chain integrity: backward links and bundle content-id match.

use serde::Serialize;

use crate::bundle::ExportedBundle;
use crate::receipt::Receipt;
use crate::types::ContentId;

/// Result of checking a bundle's chain.
///
/// `chain_ok` and `cid_match` are independent: a broken link says nothing
/// about the advertised content id and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainCheck {
    /// Every receipt after the first names its predecessor's hash.
    pub chain_ok: bool,
    /// Index of the first receipt whose back-link does not match.
    pub first_break: Option<usize>,
    /// Content id recomputed over the whole bundle document.
    pub bundle_cid: ContentId,
    /// The recomputed id equals the advertised one. False when none was advertised.
    pub cid_match: bool,
}

/// Index of the first receipt whose `prev_receipt_hash` does not equal its
/// predecessor's `receipt_hash`. Index 0 is never a break.
pub fn first_broken_link(chain: &[Receipt]) -> Option<usize> {
    chain
        .windows(2)
        .position(|pair| !pair[1].links_to(&pair[0]))
        .map(|i| i + 1)
}

/// Check both link integrity and the advertised content id.
pub fn check_chain(bundle: &ExportedBundle, advertised: Option<&str>) -> ChainCheck {
    let first_break = first_broken_link(bundle.chain());
    let bundle_cid = bundle.content_id();
    let cid_match = advertised.is_some_and(|advertised| bundle_cid.matches(advertised));

    ChainCheck {
        chain_ok: first_break.is_none(),
        first_break,
        bundle_cid,
        cid_match,
    }
}
