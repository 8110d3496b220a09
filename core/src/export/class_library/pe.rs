//! PE32 envelope (ECMA-335 II.25) around a metadata blob.
//!
//! Layout: headers in the first file-aligned block, then `.text` holding the
//! import address table, the CLI header, the metadata, the import table and
//! the `_CorDllMain` jump stub, then `.reloc` fixing up the stub operand.

use enumgen_buffer::ByteBufferMut;

pub(crate) const IMAGE_BASE: u32 = 0x1000_0000;
pub(crate) const SECTION_ALIGNMENT: u32 = 0x2000;
pub(crate) const FILE_ALIGNMENT: u32 = 0x200;
pub(crate) const PE_HEADER_OFFSET: u32 = 0x80;
pub(crate) const PE32_MAGIC: u16 = 0x10B;
pub(crate) const MACHINE_I386: u16 = 0x14C;
pub(crate) const CLI_HEADER_SIZE: u32 = 72;
pub(crate) const CLI_DIRECTORY: usize = 14;
const OPTIONAL_HEADER_SIZE: u16 = 0xE0;
const DATA_DIRECTORIES: usize = 16;

const IMPORT_DIRECTORY: usize = 1;
const RELOC_DIRECTORY: usize = 5;
const IAT_DIRECTORY: usize = 12;

const TEXT_RVA: u32 = SECTION_ALIGNMENT;
const IAT_SIZE: u32 = 8;
const IMPORT_DESCRIPTORS_SIZE: u32 = 40;
const RELOC_BLOCK_SIZE: u32 = 12;

const TEXT_CHARACTERISTICS: u32 = 0x6000_0020;
const RELOC_CHARACTERISTICS: u32 = 0x4200_0040;

const COR_DLL_MAIN: &str = "_CorDllMain";
const MSCOREE: &str = "mscoree.dll";

const DOS_STUB: [u8; 14] = [
    0x0E, 0x1F, 0xBA, 0x0E, 0x00, 0xB4, 0x09, 0xCD, 0x21, 0xB8, 0x01, 0x4C, 0xCD, 0x21,
];
const DOS_MESSAGE: &[u8] = b"This program cannot be run in DOS mode.\r\r\n$";

fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Relative virtual addresses of everything in `.text`.
struct TextLayout {
    cli_header:   u32,
    metadata:     u32,
    import_table: u32,
    lookup_table: u32,
    hint_name:    u32,
    dll_name:     u32,
    entry_point:  u32,
    end:          u32,
}

impl TextLayout {
    fn new(metadata_len: u32) -> TextLayout {
        let cli_header = TEXT_RVA + IAT_SIZE;
        let metadata = cli_header + CLI_HEADER_SIZE;
        let import_table = align_up(metadata + metadata_len, 4);
        let lookup_table = import_table + IMPORT_DESCRIPTORS_SIZE;
        let hint_name = lookup_table + 8;
        let dll_name = hint_name + 2 + COR_DLL_MAIN.len() as u32 + 1;
        let names_end = dll_name + MSCOREE.len() as u32 + 1;
        // The jump operand after `FF 25` must be 4-byte aligned.
        let entry_point = align_up(names_end + 2, 4) - 2;
        TextLayout {
            cli_header,
            metadata,
            import_table,
            lookup_table,
            hint_name,
            dll_name,
            entry_point,
            end: entry_point + 6,
        }
    }
}

/// Wrap `metadata` into a complete DLL image.
pub(crate) fn build_image(metadata: &[u8]) -> Vec<u8> {
    let text = TextLayout::new(metadata.len() as u32);
    let text_size = text.end - TEXT_RVA;
    let text_raw_size = align_up(text_size, FILE_ALIGNMENT);
    let reloc_rva = align_up(text.end, SECTION_ALIGNMENT);
    let reloc_raw_size = FILE_ALIGNMENT;
    let image_size = align_up(reloc_rva + RELOC_BLOCK_SIZE, SECTION_ALIGNMENT);
    let headers_size = FILE_ALIGNMENT;

    let mut bb = ByteBufferMut::new();
    write_dos_header(&mut bb);

    bb.write_bytes(b"PE\0\0");
    bb.write_u16(MACHINE_I386);
    bb.write_u16(2);
    bb.write_u32(0);
    bb.write_u32(0);
    bb.write_u32(0);
    bb.write_u16(OPTIONAL_HEADER_SIZE);
    // EXECUTABLE_IMAGE | LARGE_ADDRESS_AWARE | DLL
    bb.write_u16(0x2022);

    bb.write_u16(PE32_MAGIC);
    bb.write_byte(48);
    bb.write_byte(0);
    bb.write_u32(text_raw_size);
    bb.write_u32(reloc_raw_size);
    bb.write_u32(0);
    bb.write_u32(text.entry_point);
    bb.write_u32(TEXT_RVA);
    bb.write_u32(reloc_rva);
    bb.write_u32(IMAGE_BASE);
    bb.write_u32(SECTION_ALIGNMENT);
    bb.write_u32(FILE_ALIGNMENT);
    bb.write_u16(4);
    bb.write_u16(0);
    bb.write_u16(0);
    bb.write_u16(0);
    bb.write_u16(4);
    bb.write_u16(0);
    bb.write_u32(0);
    bb.write_u32(image_size);
    bb.write_u32(headers_size);
    bb.write_u32(0);
    // WINDOWS_CUI
    bb.write_u16(3);
    // DYNAMIC_BASE | NX_COMPAT | NO_SEH | TERMINAL_SERVER_AWARE
    bb.write_u16(0x8540);
    bb.write_u32(0x10_0000);
    bb.write_u32(0x1000);
    bb.write_u32(0x10_0000);
    bb.write_u32(0x1000);
    bb.write_u32(0);
    bb.write_u32(DATA_DIRECTORIES as u32);

    let mut directories = [(0u32, 0u32); DATA_DIRECTORIES];
    directories[IMPORT_DIRECTORY] = (text.import_table, IMPORT_DESCRIPTORS_SIZE);
    directories[RELOC_DIRECTORY] = (reloc_rva, RELOC_BLOCK_SIZE);
    directories[IAT_DIRECTORY] = (TEXT_RVA, IAT_SIZE);
    directories[CLI_DIRECTORY] = (text.cli_header, CLI_HEADER_SIZE);
    for (rva, size) in directories {
        bb.write_u32(rva);
        bb.write_u32(size);
    }

    write_section_header(&mut bb, b".text", text_size, TEXT_RVA, text_raw_size, headers_size, TEXT_CHARACTERISTICS);
    write_section_header(
        &mut bb,
        b".reloc",
        RELOC_BLOCK_SIZE,
        reloc_rva,
        reloc_raw_size,
        headers_size + text_raw_size,
        RELOC_CHARACTERISTICS,
    );
    bb.write_zeros(headers_size as usize - bb.len());

    write_text_section(&mut bb, &text, metadata);
    bb.write_zeros((headers_size + text_raw_size) as usize - bb.len());

    let fixup = text.entry_point + 2;
    let page = fixup & !0xFFF;
    bb.write_u32(page);
    bb.write_u32(RELOC_BLOCK_SIZE);
    // IMAGE_REL_BASED_HIGHLOW
    bb.write_u16((3 << 12) | (fixup - page) as u16);
    bb.write_u16(0);
    bb.write_zeros((reloc_raw_size - RELOC_BLOCK_SIZE) as usize);

    bb.data()
}

fn write_dos_header(bb: &mut ByteBufferMut) {
    bb.write_bytes(b"MZ");
    bb.write_u16(0x90);
    bb.write_u16(3);
    bb.write_u16(0);
    bb.write_u16(4);
    bb.write_u16(0);
    bb.write_u16(0xFFFF);
    bb.write_u16(0);
    bb.write_u16(0xB8);
    bb.write_zeros(6);
    bb.write_u16(0x40);
    bb.write_zeros(0x3C - bb.len());
    bb.write_u32(PE_HEADER_OFFSET);
    bb.write_bytes(&DOS_STUB);
    bb.write_bytes(DOS_MESSAGE);
    bb.write_zeros(PE_HEADER_OFFSET as usize - bb.len());
}

fn write_section_header(
    bb: &mut ByteBufferMut,
    name: &[u8],
    virtual_size: u32,
    virtual_address: u32,
    raw_size: u32,
    raw_pointer: u32,
    characteristics: u32,
) {
    bb.write_bytes(name);
    bb.write_zeros(8 - name.len());
    bb.write_u32(virtual_size);
    bb.write_u32(virtual_address);
    bb.write_u32(raw_size);
    bb.write_u32(raw_pointer);
    bb.write_zeros(12);
    bb.write_u32(characteristics);
}

fn write_text_section(bb: &mut ByteBufferMut, text: &TextLayout, metadata: &[u8]) {
    let start = bb.len();
    let at = |rva: u32| start + (rva - TEXT_RVA) as usize;

    // Import address table
    bb.write_u32(text.hint_name);
    bb.write_u32(0);

    bb.write_u32(CLI_HEADER_SIZE);
    bb.write_u16(2);
    bb.write_u16(5);
    bb.write_u32(text.metadata);
    bb.write_u32(metadata.len() as u32);
    // COMIMAGE_FLAGS_ILONLY
    bb.write_u32(1);
    bb.write_u32(0);
    bb.write_zeros((CLI_HEADER_SIZE - 24) as usize);

    bb.write_bytes(metadata);
    bb.write_zeros(at(text.import_table) - bb.len());

    bb.write_u32(text.lookup_table);
    bb.write_u32(0);
    bb.write_u32(0);
    bb.write_u32(text.dll_name);
    bb.write_u32(TEXT_RVA);
    bb.write_zeros(20);

    bb.write_u32(text.hint_name);
    bb.write_u32(0);

    bb.write_u16(0);
    bb.write_string(COR_DLL_MAIN);
    bb.write_string(MSCOREE);
    bb.write_zeros(at(text.entry_point) - bb.len());

    bb.write_bytes(&[0xFF, 0x25]);
    bb.write_u32(IMAGE_BASE + TEXT_RVA);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_operand_is_aligned() {
        for len in [0u32, 1, 2, 3, 100, 4097] {
            let text = TextLayout::new(len);
            assert_eq!((text.entry_point + 2) % 4, 0);
            assert_eq!(text.metadata, 0x2050);
            assert_eq!(text.import_table % 4, 0);
        }
    }

    #[test]
    fn image_is_file_aligned() {
        let image = build_image(&[0u8; 64]);
        assert_eq!(&image[..2], b"MZ");
        assert_eq!(&image[0x80..0x84], b"PE\0\0");
        assert_eq!(image.len() % FILE_ALIGNMENT as usize, 0);
        assert_eq!(image.len(), 3 * FILE_ALIGNMENT as usize);
    }
}
