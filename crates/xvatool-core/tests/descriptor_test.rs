//! Integration tests for VMDK descriptor output.

use tempfile::TempDir;
use xvatool_core::vmdk::{render_descriptor, write_descriptor, CidGenerator, RandomCid};

struct FixedCid(u32);

impl CidGenerator for FixedCid {
    fn next_cid(&mut self) -> u32 {
        self.0
    }
}

#[test]
fn test_descriptor_written_next_to_extent() {
    let dir = TempDir::new().unwrap();
    let extent = dir.path().join("vm-disk-0.raw");

    let path = write_descriptor(&extent, 8192, &mut FixedCid(0xdeadbeef)).unwrap();
    assert_eq!(path, dir.path().join("vm-disk-0.vmdk"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "# Disk DescriptorFile\n\
         version=1\n\
         CID=deadbeef\n\
         parentCID=ffffffff\n\
         createType=\"monolithicFlat\"\n\
         \n\
         # Extent description\n\
         RW 16 FLAT \"vm-disk-0.raw\" 0\n"
    );
}

#[test]
fn test_sector_counts_truncate() {
    let dir = TempDir::new().unwrap();
    let cases = [(0u64, "RW 0 "), (512, "RW 1 "), (1000, "RW 1 "), (1024, "RW 2 ")];

    for (i, (size, expected)) in cases.iter().enumerate() {
        let extent = dir.path().join(format!("vm-disk-{i}.raw"));
        let path = write_descriptor(&extent, *size, &mut FixedCid(0)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(
            content.contains(expected),
            "size {size}: expected {expected:?} in {content:?}"
        );
    }
}

#[test]
fn test_extent_referenced_by_base_name() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("deep").join("dirs");
    std::fs::create_dir_all(&nested).unwrap();

    let extent = nested.join("vm-disk-3.raw");
    let path = write_descriptor(&extent, 512, &mut FixedCid(1)).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    // The extent is named without any directory component.
    assert!(content.contains("FLAT \"vm-disk-3.raw\" 0"));
}

#[test]
fn test_render_matches_written_output() {
    let dir = TempDir::new().unwrap();
    let extent = dir.path().join("a.raw");

    let path = write_descriptor(&extent, 4096, &mut FixedCid(0x1234)).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_descriptor(0x1234, 4096, "a.raw"));
}

#[test]
fn test_seeded_cids_reproducible() {
    let mut a = RandomCid::seeded(99);
    let mut b = RandomCid::seeded(99);
    let first: Vec<u32> = (0..4).map(|_| a.next_cid()).collect();
    let second: Vec<u32> = (0..4).map(|_| b.next_cid()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_distinct_seeds_diverge() {
    let mut a = RandomCid::seeded(1);
    let mut b = RandomCid::seeded(2);
    let first: Vec<u32> = (0..4).map(|_| a.next_cid()).collect();
    let second: Vec<u32> = (0..4).map(|_| b.next_cid()).collect();
    assert_ne!(first, second);
}
