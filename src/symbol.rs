use lazy_static::lazy_static;
use xmas_elf::ElfFile;
use xmas_elf::sections::SectionData;
use xmas_elf::symbol_table::{Entry, Type};

use crate::sync::UPSafeCell;

/// Debug metadata for one resolved instruction address.
///
/// `fn_name` carries an explicit display length in `fn_namelen`; the
/// backing store may append annotations after the real name, and the
/// formatter must truncate rather than assume any delimiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugInfo<'a> {
    pub file: &'a str,
    pub line: u32,
    pub fn_name: &'a str,
    pub fn_namelen: usize,
    pub fn_addr: u32,
}

/// Maps an instruction address to the nearest covering function symbol.
///
/// `None` is the failure sentinel: the address is not covered by any known
/// symbol and the caller degrades to raw output. There are no partial
/// results.
pub trait SymbolResolver {
    fn resolve(&self, addr: u32) -> Option<DebugInfo<'_>>;
}

/// One function symbol. `size == 0` means the extent is unknown and the
/// next entry's start (if any) bounds it instead.
#[derive(Clone, Copy, Debug)]
pub struct SymEntry<'a> {
    pub addr: u32,
    pub size: u32,
    pub name: &'a str,
    pub file: &'a str,
    pub line: u32,
}

impl SymEntry<'_> {
    pub const EMPTY: SymEntry<'static> = SymEntry {
        addr: 0,
        size: 0,
        name: "",
        file: "",
        line: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLoadError {
    /// The image is not a well-formed ELF.
    Parse(&'static str),
    /// More FUNC symbols than the caller-provided storage holds.
    TooManySymbols,
}

/// Address-sorted symbol table over borrowed entries.
#[derive(Clone, Copy)]
pub struct SymbolTable<'a> {
    entries: &'a [SymEntry<'a>],
}

impl<'a> SymbolTable<'a> {
    /// `entries` must already be sorted by address.
    pub fn new(entries: &'a [SymEntry<'a>]) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].addr <= w[1].addr));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a table from the FUNC symbols of an ELF image.
    ///
    /// Works for both ELF32 and ELF64 symbol tables (symbols whose value
    /// does not fit the 32-bit address space are skipped). ELF symtabs
    /// carry no file or line information, so every entry reports the
    /// caller-supplied `source` name and line 0; this is the best-effort
    /// end of the nearest-symbol contract. Entries land in `slots` and are
    /// sorted in place.
    pub fn from_elf(
        data: &'a [u8],
        source: &'a str,
        slots: &'a mut [SymEntry<'a>],
    ) -> Result<Self, SymbolLoadError> {
        let elf = ElfFile::new(data).map_err(SymbolLoadError::Parse)?;
        let mut n = 0;
        for section in elf.section_iter() {
            match section.get_data(&elf) {
                Ok(SectionData::SymbolTable32(entries)) => {
                    n = collect_funcs(&elf, entries, source, slots, n)?;
                }
                Ok(SectionData::SymbolTable64(entries)) => {
                    n = collect_funcs(&elf, entries, source, slots, n)?;
                }
                _ => {}
            }
        }
        let filled = &mut slots[..n];
        filled.sort_unstable_by_key(|e| e.addr);
        Ok(Self { entries: filled })
    }
}

fn collect_funcs<'a, E: Entry>(
    elf: &ElfFile<'a>,
    entries: &'a [E],
    source: &'a str,
    slots: &mut [SymEntry<'a>],
    mut n: usize,
) -> Result<usize, SymbolLoadError> {
    for e in entries {
        if !matches!(e.get_type(), Ok(Type::Func)) {
            continue;
        }
        let Ok(name) = e.get_name(elf) else {
            continue;
        };
        if name.is_empty() || e.value() > u32::MAX as u64 {
            continue;
        }
        if n == slots.len() {
            return Err(SymbolLoadError::TooManySymbols);
        }
        slots[n] = SymEntry {
            addr: e.value() as u32,
            size: e.size().min(u32::MAX as u64) as u32,
            name,
            file: source,
            line: 0,
        };
        n += 1;
    }
    Ok(n)
}

impl<'a> SymbolTable<'a> {
    /// Nearest function symbol whose entry address is at or below `addr`
    /// and whose range plausibly contains it.
    pub fn resolve(&self, addr: u32) -> Option<DebugInfo<'a>> {
        let idx = self.entries.partition_point(|e| e.addr <= addr).checked_sub(1)?;
        let entry = &self.entries[idx];
        let covered = if entry.size > 0 {
            addr - entry.addr < entry.size
        } else {
            // Unknown extent: bounded by the next symbol, open-ended for
            // the last one.
            match self.entries.get(idx + 1) {
                Some(next) => addr < next.addr,
                None => true,
            }
        };
        if !covered {
            return None;
        }
        Some(DebugInfo {
            file: entry.file,
            line: entry.line,
            fn_name: entry.name,
            fn_namelen: entry.name.len(),
            fn_addr: entry.addr,
        })
    }
}

impl SymbolResolver for SymbolTable<'_> {
    fn resolve(&self, addr: u32) -> Option<DebugInfo<'_>> {
        SymbolTable::resolve(self, addr)
    }
}

lazy_static! {
    static ref KERNEL_SYMBOLS: UPSafeCell<Option<SymbolTable<'static>>> =
        unsafe { UPSafeCell::new(None) };
}

/// Install the kernel's own symbol table. Called once at boot, before the
/// monitor can run.
pub fn install_kernel_symbols(table: SymbolTable<'static>) {
    *KERNEL_SYMBOLS.exclusive_access() = Some(table);
}

pub fn kernel_symbols_installed() -> bool {
    KERNEL_SYMBOLS.exclusive_access().is_some()
}

/// Resolver over the installed kernel symbol table. Resolves nothing until
/// `install_kernel_symbols` has run.
pub struct KernelSymbols;

impl SymbolResolver for KernelSymbols {
    fn resolve(&self, addr: u32) -> Option<DebugInfo<'_>> {
        KERNEL_SYMBOLS
            .exclusive_access()
            .as_ref()
            .and_then(|t| t.resolve(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENTRIES: [SymEntry<'static>; 3] = [
        SymEntry {
            addr: 0x1000,
            size: 0x80,
            name: "boot_main",
            file: "init.rs",
            line: 12,
        },
        SymEntry {
            addr: 0x1080,
            size: 0,
            name: "trap_entry",
            file: "trap.rs",
            line: 40,
        },
        SymEntry {
            addr: 0x1100,
            size: 0x20,
            name: "idle_loop",
            file: "task.rs",
            line: 77,
        },
    ];

    #[test]
    fn resolves_entry_and_interior_addresses() {
        let table = SymbolTable::new(&ENTRIES);
        let info = table.resolve(0x1000).unwrap();
        assert_eq!(info.fn_name, "boot_main");
        assert_eq!(info.fn_addr, 0x1000);
        assert_eq!(info.file, "init.rs");
        assert_eq!(info.line, 12);

        let info = table.resolve(0x1044).unwrap();
        assert_eq!(info.fn_name, "boot_main");
        assert_eq!(0x1044 - info.fn_addr, 0x44);
    }

    #[test]
    fn zero_size_entry_is_bounded_by_its_neighbor() {
        let table = SymbolTable::new(&ENTRIES);
        assert_eq!(table.resolve(0x10ff).unwrap().fn_name, "trap_entry");
        assert_eq!(table.resolve(0x1100).unwrap().fn_name, "idle_loop");
    }

    #[test]
    fn misses_are_a_sentinel_not_a_partial_result() {
        let table = SymbolTable::new(&ENTRIES);
        assert_eq!(table.resolve(0xfff), None); // below the first symbol
        assert_eq!(table.resolve(0x1120), None); // past the last extent
    }

    #[test]
    fn last_zero_size_entry_accepts_best_effort() {
        static TAIL: [SymEntry<'static>; 1] = [SymEntry {
            addr: 0x2000,
            size: 0,
            name: "halt",
            file: "init.rs",
            line: 1,
        }];
        let table = SymbolTable::new(&TAIL);
        assert_eq!(table.resolve(0x2abc).unwrap().fn_name, "halt");
    }

    #[test]
    fn kernel_registry_serves_installed_table() {
        assert_eq!(KernelSymbols.resolve(0x1000), None);
        install_kernel_symbols(SymbolTable::new(&ENTRIES));
        assert!(kernel_symbols_installed());
        assert_eq!(KernelSymbols.resolve(0x1010).unwrap().fn_name, "boot_main");
    }

    // Minimal handcrafted ELF32 with a .symtab of two FUNC symbols.
    fn build_elf32() -> Vec<u8> {
        fn p16(v: &mut Vec<u8>, x: u16) {
            v.extend_from_slice(&x.to_le_bytes());
        }
        fn p32(v: &mut Vec<u8>, x: u32) {
            v.extend_from_slice(&x.to_le_bytes());
        }

        let strtab = b"\0main\0helper\0"; // main at 1, helper at 6
        let shstrtab = b"\0.symtab\0.strtab\0.shstrtab\0"; // 1, 9, 17

        let symtab_off = 52u32;
        let symtab_size = 3 * 16u32;
        let strtab_off = symtab_off + symtab_size; // 100
        let shstrtab_off = strtab_off + strtab.len() as u32; // 113
        let shoff = 140u32; // 4-aligned, past all section data

        let mut v = Vec::new();
        // e_ident
        v.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        v.extend_from_slice(&[0; 8]);
        p16(&mut v, 2); // ET_EXEC
        p16(&mut v, 0xf3); // EM_RISCV
        p32(&mut v, 1);
        p32(&mut v, 0x1000); // e_entry
        p32(&mut v, 0); // e_phoff
        p32(&mut v, shoff);
        p32(&mut v, 0); // e_flags
        p16(&mut v, 52); // e_ehsize
        p16(&mut v, 0); // e_phentsize
        p16(&mut v, 0); // e_phnum
        p16(&mut v, 40); // e_shentsize
        p16(&mut v, 4); // e_shnum
        p16(&mut v, 3); // e_shstrndx
        assert_eq!(v.len(), 52);

        // .symtab: null entry, then main and helper (STT_FUNC, SHN_ABS).
        let sym = |v: &mut Vec<u8>, name: u32, value: u32, size: u32, info: u8| {
            p32(v, name);
            p32(v, value);
            p32(v, size);
            v.push(info);
            v.push(0);
            p16(v, 0xfff1);
        };
        sym(&mut v, 0, 0, 0, 0);
        sym(&mut v, 1, 0x1000, 0x40, 0x12); // GLOBAL | FUNC
        sym(&mut v, 6, 0x1080, 0x20, 0x12);
        assert_eq!(v.len() as u32, strtab_off);

        v.extend_from_slice(strtab);
        v.extend_from_slice(shstrtab);
        while (v.len() as u32) < shoff {
            v.push(0);
        }

        let shdr = |v: &mut Vec<u8>,
                        name: u32,
                        ty: u32,
                        off: u32,
                        size: u32,
                        link: u32,
                        entsize: u32| {
            p32(v, name);
            p32(v, ty);
            p32(v, 0); // flags
            p32(v, 0); // addr
            p32(v, off);
            p32(v, size);
            p32(v, link);
            p32(v, 0); // info
            p32(v, 4); // addralign
            p32(v, entsize);
        };
        shdr(&mut v, 0, 0, 0, 0, 0, 0);
        shdr(&mut v, 1, 2, symtab_off, symtab_size, 2, 16); // SHT_SYMTAB -> .strtab
        shdr(&mut v, 9, 3, strtab_off, strtab.len() as u32, 0, 0);
        shdr(&mut v, 17, 3, shstrtab_off, shstrtab.len() as u32, 0, 0);
        v
    }

    #[test]
    fn loads_func_symbols_from_elf_image() {
        let image = build_elf32();
        let mut slots = [SymEntry::EMPTY; 8];
        let table = SymbolTable::from_elf(&image, "kernel", &mut slots).unwrap();
        assert_eq!(table.len(), 2);

        let info = table.resolve(0x1010).unwrap();
        assert_eq!(info.fn_name, "main");
        assert_eq!(info.fn_addr, 0x1000);
        assert_eq!(info.file, "kernel");
        assert_eq!(info.line, 0);

        assert_eq!(table.resolve(0x1090).unwrap().fn_name, "helper");
        assert_eq!(table.resolve(0x1040), None); // between the two
    }

    #[test]
    fn from_elf_rejects_garbage_and_tiny_storage() {
        let mut slots = [SymEntry::EMPTY; 8];
        assert!(matches!(
            SymbolTable::from_elf(b"not an elf", "kernel", &mut slots),
            Err(SymbolLoadError::Parse(_))
        ));

        let image = build_elf32();
        let mut one = [SymEntry::EMPTY; 1];
        assert!(matches!(
            SymbolTable::from_elf(&image, "kernel", &mut one),
            Err(SymbolLoadError::TooManySymbols)
        ));
    }
}
