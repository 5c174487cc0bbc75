//! VM parameters.

/// Initial operand stack size, in cells.
pub const INITIAL_STACK_SIZE: usize = 32;

/// Initial code buffer capacity, in bytes.
pub const INITIAL_CODE_CAPACITY: usize = 128;

/// Encoded length of a `call`/`jmp` instruction; the return address pushed
/// by `call` is the instruction address plus this.
pub const CALL_LEN: u32 = 3;

/// Bookkeeping words sitting on top of every call frame: return address,
/// saved `bp`, and the slot count to drop at return.
pub const FRAME_WORDS: u32 = 3;

/// Magic prefix of a persisted bytecode image.
pub const IMAGE_MAGIC: &[u8; 5] = b"LIME!";
