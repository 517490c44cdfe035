mod deltas;

pub use self::deltas::{Attribution, DeltaPolicy, Deltas, OnCounterReset};
