mod contracts;
pub use contracts::*;

mod merkle;
pub use merkle::MerkleTree;

mod op;
pub use op::*;

mod receipt;
pub use receipt::*;

mod record;
pub use record::*;

mod transfer;
pub use transfer::*;
