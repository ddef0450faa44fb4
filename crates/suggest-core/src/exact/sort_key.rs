//! Sort records for the exact engine: `escape(term) ++ [0, 0] ++ seq_be ++ cost_be`.
//!
//! A zero byte inside the term is written as `0x00 0xFF`, so the `0x00 0x00`
//! terminator sorts before any continuation of the term and byte order over
//! records equals `(term, seq)` order. `seq` is the input position, so the
//! first record of each term is its first occurrence.

use crate::lookup::SuggestError;

const TAIL_LEN: usize = 8 + 4;

pub(crate) fn encode(term: &[u8], seq: u64, cost: u32, out: &mut Vec<u8>) {
    out.clear();
    for &b in term {
        out.push(b);
        if b == 0 {
            out.push(0xFF);
        }
    }
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&seq.to_be_bytes());
    out.extend_from_slice(&cost.to_be_bytes());
}

/// Split a record back into its term (written to `term`) and cost.
pub(crate) fn decode(record: &[u8], term: &mut Vec<u8>) -> Result<u32, SuggestError> {
    term.clear();
    let mut i = 0;
    while i < record.len() {
        match (record[i], record.get(i + 1)) {
            (0, Some(0xFF)) => {
                term.push(0);
                i += 2;
            }
            (0, Some(0)) => {
                let tail = &record[i + 2..];
                if tail.len() != TAIL_LEN {
                    return Err(malformed());
                }
                let cost: [u8; 4] = tail[8..].try_into().map_err(|_| malformed())?;
                return Ok(u32::from_be_bytes(cost));
            }
            (0, _) => return Err(malformed()),
            (b, _) => {
                term.push(b);
                i += 1;
            }
        }
    }
    Err(malformed())
}

fn malformed() -> SuggestError {
    SuggestError::Parse("malformed exact sort record".to_string())
}
