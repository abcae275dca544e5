//! Pipeline stages for statement analysis.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets a caller swap
//! one (a different extractor, a fake backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompt ──▶ llm ──▶ parse ──▶ aggregate
//! (bytes)   (pages)     (text)     (raw)   (txns)    (summary)
//! ```
//!
//! 1. [`input`]    : load a local path or download a URL into memory
//! 2. [`extract`]  : page texts via pdfium or plain text; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`prompt`]   : clean the text and wrap it in instructions; refuses
//!    documents over the size cap
//! 4. [`llm`]      : the inference call with timeout and retry; the only
//!    stage with network I/O
//! 5. [`parse`]    : recover and validate transactions from untrusted output
//! 6. [`aggregate`]: exact monthly and category summaries

pub mod aggregate;
pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod prompt;
