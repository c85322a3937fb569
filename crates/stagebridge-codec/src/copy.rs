//! Stream tuples from a reader to a writer

use crate::{CodecError, TupleReader, TupleWriter};
use stagebridge_core::Tuple;
use tracing::debug;

/// Move every tuple from `reader` to `writer` through the scratch tuple `row`
///
/// Returns the number of tuples copied. The writer is not flushed; whoever
/// owns it decides when the stream is complete.
pub fn copy<R, W>(reader: &mut R, writer: &mut W, row: &mut Tuple) -> Result<u64, CodecError>
where
    R: TupleReader + ?Sized,
    W: TupleWriter + ?Sized,
{
    let mut copied = 0u64;
    while reader.next(row)? {
        writer.write_tuple(row)?;
        copied += 1;
    }
    debug!("Copied {} tuples", copied);
    Ok(copied)
}
