use coffer::types::{
    MAX_CELL_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE, SLOT_DIRECTORY_ENTRY_SIZE,
    error::DatabaseError,
    page::{Page, PageType},
};

fn create_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn create_sample_record_data(id: u32) -> Vec<u8> {
    format!("record_data_{:06}", id).into_bytes()
}

#[test]
fn test_page_creation_and_basic_properties() {
    let page = Page::new(1, PageType::Data);

    assert_eq!(page.page_id, 1);
    assert_eq!(page.page_type, PageType::Data);
    assert_eq!(page.next_page_id, None);
    assert_eq!(page.cell_count, 0);
    assert_eq!(page.free_space_offset, PAGE_SIZE as u16);
    assert!(page.is_empty());
    assert_eq!(page.available_space(), PAGE_SIZE - PAGE_HEADER_SIZE);
}

#[test]
fn test_page_type_tags() {
    for page_type in [
        PageType::Data,
        PageType::Index,
        PageType::Catalog,
        PageType::FreeList,
    ] {
        assert_eq!(PageType::from_u8(page_type.as_u8()).unwrap(), page_type);
    }
    assert!(matches!(
        PageType::from_u8(0),
        Err(DatabaseError::InvalidPageType(0))
    ));
}

#[test]
fn test_cell_insertion_and_retrieval() {
    let mut page = Page::new(1, PageType::Data);
    let first = create_sample_record_data(1);
    let second = create_sample_record_data(2);

    assert_eq!(page.insert_cell(&first).unwrap(), 0);
    assert_eq!(page.insert_cell(&second).unwrap(), 1);

    assert_eq!(page.cell_count, 2);
    assert_eq!(page.get_cell(0), Some(first.as_slice()));
    assert_eq!(page.get_cell(1), Some(second.as_slice()));
    assert_eq!(page.get_cell(2), None);

    let expected_free = PAGE_SIZE
        - PAGE_HEADER_SIZE
        - 2 * SLOT_DIRECTORY_ENTRY_SIZE
        - first.len()
        - second.len();
    assert_eq!(page.available_space(), expected_free);
}

#[test]
fn test_page_full() {
    let mut page = Page::new(4, PageType::Data);
    let largest = create_test_data(MAX_CELL_SIZE);
    page.insert_cell(&largest).unwrap();
    assert_eq!(page.available_space(), 0);

    assert!(matches!(
        page.insert_cell(&[1]),
        Err(DatabaseError::PageFull { page_id: 4 })
    ));

    let mut fresh = Page::new(5, PageType::Data);
    assert!(!fresh.can_fit(MAX_CELL_SIZE + 1));
    assert!(fresh.insert_cell(&create_test_data(MAX_CELL_SIZE + 1)).is_err());
}

#[test]
fn test_delete_shifts_slots_and_compacts() {
    let mut page = Page::new(1, PageType::Data);
    let cells: Vec<Vec<u8>> = (0..5).map(create_sample_record_data).collect();
    for cell in &cells {
        page.insert_cell(cell).unwrap();
    }
    let space_before = page.available_space();

    page.delete_cell(1).unwrap();

    assert_eq!(page.cell_count, 4);
    assert_eq!(page.get_cell(0), Some(cells[0].as_slice()));
    assert_eq!(page.get_cell(1), Some(cells[2].as_slice()));
    assert_eq!(page.get_cell(3), Some(cells[4].as_slice()));
    assert_eq!(
        page.available_space(),
        space_before + cells[1].len() + SLOT_DIRECTORY_ENTRY_SIZE
    );

    assert!(matches!(
        page.delete_cell(4),
        Err(DatabaseError::InvalidSlotIndex { index: 4, max: 4 })
    ));
}

#[test]
fn test_page_serialization() {
    let mut page = Page::new(9, PageType::Index);
    page.next_page_id = Some(12);
    for i in 0..20 {
        page.insert_cell(&create_sample_record_data(i)).unwrap();
    }
    page.delete_cell(3).unwrap();

    let bytes = page.to_bytes();
    assert_eq!(bytes.len(), PAGE_SIZE);

    let decoded = Page::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.page_id, 9);
    assert_eq!(decoded.page_type, PageType::Index);
    assert_eq!(decoded.next_page_id, Some(12));
    assert_eq!(decoded.cell_count, 19);
    let original: Vec<&[u8]> = page.cells().collect();
    let restored: Vec<&[u8]> = decoded.cells().collect();
    assert_eq!(original, restored);
}

#[test]
fn test_checksum_detects_corruption() {
    let mut page = Page::new(3, PageType::Data);
    page.insert_cell(b"good dog").unwrap();
    let bytes = page.to_bytes();

    for position in [0, 8, 40, PAGE_SIZE - 1] {
        let mut corrupted = bytes.clone();
        corrupted[position] ^= 0x5A;
        assert!(
            matches!(
                Page::from_bytes(&corrupted),
                Err(DatabaseError::CorruptPage { .. })
            ),
            "flipping byte {} should be detected",
            position
        );
    }
}

#[test]
fn test_invalid_page_size() {
    assert!(matches!(
        Page::from_bytes(&[0u8; 100]),
        Err(DatabaseError::InvalidPageSize {
            expected: PAGE_SIZE,
            actual: 100
        })
    ));
}

#[test]
fn test_relocate_and_clear() {
    let mut page = Page::new(2, PageType::Data);
    page.insert_cell(b"one").unwrap();
    page.insert_cell(b"two").unwrap();

    let moved = page.relocate(7);
    assert_eq!(moved.page_id, 7);
    assert_eq!(moved.cells().collect::<Vec<_>>(), page.cells().collect::<Vec<_>>());
    assert_eq!(Page::from_bytes(&moved.to_bytes()).unwrap().page_id, 7);

    page.clear();
    assert!(page.is_empty());
    assert_eq!(page.available_space(), PAGE_SIZE - PAGE_HEADER_SIZE);
}
