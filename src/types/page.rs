use crate::{
    types::{
        CHECKSUM_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE, PageId, SLOT_DIRECTORY_ENTRY_SIZE,
        error::{DatabaseError, Result},
    },
    utils::hash::{PAGE_CHECKSUM_OFFSET, calculate_page_checksum, verify_page_checksum},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Data = 1,
    Index = 2,
    Catalog = 3,
    FreeList = 4,
}

impl PageType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PageType::Data),
            2 => Ok(PageType::Index),
            3 => Ok(PageType::Catalog),
            4 => Ok(PageType::FreeList),
            _ => Err(DatabaseError::InvalidPageType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    pub offset: u16, // Offset from beginning of page
    pub length: u16, // Length of the cell
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDirectory {
    pub slots: Vec<SlotEntry>,
}

/*
 * Page Layout on Disk (Slotted Page Structure)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (32 bytes)                       │
 * │  page_id(8) | page_type(1) | next_page(8) | cell_count(2) |     │
 * │  free_space_offset(2) | checksum(4) | reserved(7)               │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                  SLOT DIRECTORY                                 │
 * │  [slot0: offset(2)|len(2)] [slot1: offset(2)|len(2)] ...        │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                   CELL DATA                                     │
 * │  [...cell N...] [...cell 2...] [...cell 1...] [...cell 0...]    │
 * └─────────────────────────────────────────────────────────────────┘
 *
 * The checksum covers every byte of the page except the checksum field.
 */

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page_id: PageId,
    pub page_type: PageType,
    pub next_page_id: Option<PageId>,

    // Slotted page structure
    pub slot_directory: SlotDirectory,
    pub free_space_offset: u16,
    pub cell_count: u16,

    // Data storage
    pub data: Vec<u8>,
}

impl Page {
    pub fn new(page_id: PageId, page_type: PageType) -> Self {
        Self {
            page_id,
            page_type,
            next_page_id: None,
            slot_directory: SlotDirectory { slots: Vec::new() },
            free_space_offset: PAGE_SIZE as u16,
            cell_count: 0,
            data: vec![0; PAGE_SIZE],
        }
    }

    /// Serialize the page to bytes following the documented layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut offset = 0;

        buffer[offset..offset + 8].copy_from_slice(&self.page_id.to_le_bytes());
        offset += 8;

        buffer[offset] = self.page_type.as_u8();
        offset += 1;

        // u64::MAX represents None
        let next_id = self.next_page_id.unwrap_or(u64::MAX);
        buffer[offset..offset + 8].copy_from_slice(&next_id.to_le_bytes());
        offset += 8;

        buffer[offset..offset + 2].copy_from_slice(&self.cell_count.to_le_bytes());
        offset += 2;

        buffer[offset..offset + 2].copy_from_slice(&self.free_space_offset.to_le_bytes());

        // checksum stays zero until the rest of the page is laid out
        offset = PAGE_HEADER_SIZE;

        for slot in &self.slot_directory.slots {
            buffer[offset..offset + 2].copy_from_slice(&slot.offset.to_le_bytes());
            offset += 2;
            buffer[offset..offset + 2].copy_from_slice(&slot.length.to_le_bytes());
            offset += 2;
        }

        buffer[self.free_space_offset as usize..]
            .copy_from_slice(&self.data[self.free_space_offset as usize..]);

        let checksum = calculate_page_checksum(&buffer);
        buffer[PAGE_CHECKSUM_OFFSET..PAGE_CHECKSUM_OFFSET + CHECKSUM_SIZE]
            .copy_from_slice(&checksum.to_le_bytes());

        buffer
    }

    /// Deserialize a page, rejecting anything whose checksum, type tag or layout is off.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }

        let page_id = u64::from_le_bytes(read_array(bytes, 0));

        let stored_checksum = u32::from_le_bytes(read_array(bytes, PAGE_CHECKSUM_OFFSET));
        if !verify_page_checksum(bytes, stored_checksum) {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: "Checksum mismatch".to_string(),
            });
        }

        let page_type = PageType::from_u8(bytes[8]).map_err(|_| DatabaseError::CorruptPage {
            page_id,
            reason: format!("Invalid page type tag {}", bytes[8]),
        })?;

        let next_raw = u64::from_le_bytes(read_array(bytes, 9));
        let next_page_id = if next_raw == u64::MAX {
            None
        } else {
            Some(next_raw)
        };

        let cell_count = u16::from_le_bytes(read_array(bytes, 17));
        let free_space_offset = u16::from_le_bytes(read_array(bytes, 19));

        let directory_end = PAGE_HEADER_SIZE + cell_count as usize * SLOT_DIRECTORY_ENTRY_SIZE;
        if directory_end > free_space_offset as usize || free_space_offset as usize > PAGE_SIZE {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: format!("Invalid free_space_offset: {}", free_space_offset),
            });
        }

        let mut slots = Vec::with_capacity(cell_count as usize);
        let mut offset = PAGE_HEADER_SIZE;
        for _ in 0..cell_count {
            let slot_offset = u16::from_le_bytes(read_array(bytes, offset));
            let length = u16::from_le_bytes(read_array(bytes, offset + 2));
            offset += SLOT_DIRECTORY_ENTRY_SIZE;

            if (slot_offset as usize) < free_space_offset as usize
                || slot_offset as usize + length as usize > PAGE_SIZE
            {
                return Err(DatabaseError::CorruptPage {
                    page_id,
                    reason: format!(
                        "Slot at offset {} with length {} exceeds page boundary",
                        slot_offset, length
                    ),
                });
            }

            slots.push(SlotEntry {
                offset: slot_offset,
                length,
            });
        }

        Ok(Page {
            page_id,
            page_type,
            next_page_id,
            slot_directory: SlotDirectory { slots },
            free_space_offset,
            cell_count,
            data: bytes.to_vec(),
        })
    }

    /// Copy of this page under a different id, used when a committed page is rewritten.
    pub fn relocate(&self, new_page_id: PageId) -> Page {
        let mut copy = self.clone();
        copy.page_id = new_page_id;
        copy
    }

    pub fn available_space(&self) -> usize {
        let slot_directory_size = self.slot_directory.slots.len() * SLOT_DIRECTORY_ENTRY_SIZE;
        let used_data_space = PAGE_SIZE - self.free_space_offset as usize;
        PAGE_SIZE - PAGE_HEADER_SIZE - slot_directory_size - used_data_space
    }

    pub fn can_fit(&self, data_size: usize) -> bool {
        self.available_space() >= data_size + SLOT_DIRECTORY_ENTRY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.slot_directory.slots.is_empty()
    }

    pub fn insert_cell(&mut self, data: &[u8]) -> Result<usize> {
        if !self.can_fit(data.len()) {
            return Err(DatabaseError::PageFull {
                page_id: self.page_id,
            });
        }

        // Cells grow downward from the end of the page
        let new_offset = self.free_space_offset - data.len() as u16;

        let start = new_offset as usize;
        let end = start + data.len();
        self.data[start..end].copy_from_slice(data);

        let slot_index = self.slot_directory.slots.len();
        self.slot_directory.slots.push(SlotEntry {
            offset: new_offset,
            length: data.len() as u16,
        });

        self.free_space_offset = new_offset;
        self.cell_count += 1;

        Ok(slot_index)
    }

    pub fn get_cell(&self, slot_index: usize) -> Option<&[u8]> {
        self.slot_directory.slots.get(slot_index).map(|slot| {
            let start = slot.offset as usize;
            let end = start + slot.length as usize;
            &self.data[start..end]
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.slot_directory.slots.len()).filter_map(move |i| self.get_cell(i))
    }

    /// Removes a cell. Slots after `slot_index` shift down by one.
    pub fn delete_cell(&mut self, slot_index: usize) -> Result<()> {
        if slot_index >= self.slot_directory.slots.len() {
            return Err(DatabaseError::InvalidSlotIndex {
                index: slot_index,
                max: self.slot_directory.slots.len(),
            });
        }

        self.slot_directory.slots.remove(slot_index);
        self.cell_count -= 1;

        self.compact_page();

        Ok(())
    }

    pub fn clear(&mut self) {
        self.slot_directory.slots.clear();
        self.cell_count = 0;
        self.free_space_offset = PAGE_SIZE as u16;
        self.data[PAGE_HEADER_SIZE..].fill(0);
    }

    // Defragment the page so cell data is contiguous at the end of the page
    fn compact_page(&mut self) {
        let cells: Vec<Vec<u8>> = self.cells().map(|cell| cell.to_vec()).collect();

        self.data[PAGE_HEADER_SIZE..].fill(0);

        let mut current_offset = PAGE_SIZE;
        for (slot, cell) in self.slot_directory.slots.iter_mut().zip(cells.iter()) {
            current_offset -= cell.len();
            self.data[current_offset..current_offset + cell.len()].copy_from_slice(cell);
            slot.offset = current_offset as u16;
        }

        self.free_space_offset = current_offset as u16;
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[offset..offset + N]);
    buf
}
