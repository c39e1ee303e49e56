#[repr(C)]
/// Saved CPU state captured at a trap boundary.
///
/// The monitor only carries this through to command handlers; it never
/// mutates it and never assumes a particular trap cause. Keeping the raw
/// register words here (instead of typed CSR wrappers) leaves the type
/// free of any architecture crate, so the core stays buildable on the
/// host for tests.
///
/// Fields:
/// - `x`: General-purpose registers x0-x31 as saved by the trap entry
/// - `sstatus`: Raw supervisor status register value
/// - `sepc`: Address the trapped context would resume at
#[derive(Clone, Copy, Debug)]
pub struct TrapFrame {
    pub x: [u32; 32],
    pub sstatus: u32,
    pub sepc: u32,
}
