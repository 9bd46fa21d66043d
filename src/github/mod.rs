// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for GitHub access (transport seam, tolerant client, pagination)
// role: github/namespace
// outputs: Public submodules used by enrichment stages
// invariants: Everything here is best-effort; failures surface as None plus a warning
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod client;
pub mod pagination;
pub mod transport;
