use anyhow::Result;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("barcode `{0}` has never been registered with the encoder")]
pub struct UnknownBarcode(pub String);

/// Registry translating barcode string identifiers into dense integer codes.
///
/// Codes are assigned in first-seen order starting at 0 and are stable for
/// the lifetime of the registry; the registry grows monotonically and never
/// reuses a code. One encoder is owned per assembly session and passed by
/// reference to whatever needs code/identifier translation.
#[derive(Clone, Debug, Default)]
pub struct BarcodeEncoder {
    codes: IndexMap<String, u64>,
}

impl BarcodeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the code for `barcode`, assigning the next unused code on
    /// first sight.
    pub fn add_barcode(&mut self, barcode: &str) -> u64 {
        if let Some(&code) = self.codes.get(barcode) {
            return code;
        }
        let code = self.codes.len() as u64;
        self.codes.insert(barcode.to_string(), code);
        code
    }

    /// Looks up a previously assigned code. Querying an identifier that was
    /// never added is a caller-contract violation and fails with
    /// [`UnknownBarcode`].
    pub fn get_code(&self, barcode: &str) -> Result<u64> {
        self.codes
            .get(barcode)
            .copied()
            .ok_or_else(|| UnknownBarcode(barcode.to_string()).into())
    }

    /// Number of distinct barcodes registered so far.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
