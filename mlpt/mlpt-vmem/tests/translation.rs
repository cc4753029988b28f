use mlpt_vmem::{
    AddressSpace, CountingStore, Geometry, HostStore, PhysicalAddress, RootRegister, SpaceStats,
    VirtualAddress,
};

fn va(v: u64) -> VirtualAddress {
    VirtualAddress::new(v)
}

/// A spread of addresses touching different roots, interior tables and leaves.
fn sample_addresses(geometry: Geometry) -> Vec<u64> {
    let page = geometry.page_size();
    let span = 1u64 << geometry.virtual_bits().min(63);
    let mut out = Vec::new();
    let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
    for _ in 0..64 {
        // xorshift keeps the set deterministic
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        out.push(x % span);
    }
    out.extend([0, page, page - 1, 2 * page + 3, span - 1]);
    out
}

fn geometries() -> Vec<Geometry> {
    [(1, 12), (2, 10), (3, 10), (4, 12), (2, 4), (5, 6)]
        .into_iter()
        .map(|(l, p)| Geometry::new(l, p).unwrap())
        .collect()
}

#[test]
fn miss_before_allocate() {
    for g in geometries() {
        let mut s = AddressSpace::with_geometry(g);
        for v in sample_addresses(g) {
            assert_eq!(s.translate(va(v)), PhysicalAddress::UNMAPPED);
        }
        s.page_allocate(va(0));
        // other pages stay unmapped even once a tree exists
        assert!(s.translate(va(g.page_size())).is_unmapped());
    }
}

#[test]
fn offsets_round_trip() {
    for g in geometries() {
        let mut s = AddressSpace::with_geometry(g);
        for v in sample_addresses(g) {
            s.page_allocate(va(v));
            let pa = s.translate(va(v));
            assert!(!pa.is_unmapped(), "{g:?}: {v:#x} not mapped");
            assert_eq!(pa.as_u64() & g.offset_mask(), g.page_offset(va(v)));

            let base = v & g.page_mask();
            let page_pa = s.translate(va(base));
            for offset in [0, 1, g.offset_mask() / 2, g.offset_mask()] {
                assert_eq!(s.translate(va(base | offset)), page_pa | offset);
            }
        }
    }
}

#[test]
fn allocate_is_idempotent() {
    let g = Geometry::new(3, 10).unwrap();
    let mut store = CountingStore::new(HostStore);
    let mut s = AddressSpace::new(g, &mut store);

    s.page_allocate(va(0x1234_5678));
    let once = s.translate(va(0x1234_5678));
    let stats = s.stats();

    s.page_allocate(va(0x1234_5678));
    s.page_allocate(va(0x1234_5400));
    assert_eq!(s.translate(va(0x1234_5678)), once);
    assert_eq!(s.stats(), stats);
    drop(s);

    assert_eq!(store.stats().allocated, stats.tables + stats.pages);
}

#[test]
fn deallocate_reports_prior_mapping() {
    let g = Geometry::new(3, 10).unwrap();
    let mut s = AddressSpace::with_geometry(g);

    assert!(!s.page_deallocate(va(0x400)));
    s.page_allocate(va(0x400));
    assert!(!s.page_deallocate(va(0x800)));
    assert!(s.page_deallocate(va(0x7FF)));
    assert!(s.translate(va(0x400)).is_unmapped());
    assert!(!s.page_deallocate(va(0x400)));
}

#[test]
fn no_leak_no_double_free() {
    for g in geometries() {
        let mut store = CountingStore::new(HostStore);
        let mut s = AddressSpace::new(g, &mut store);

        let addrs = sample_addresses(g);
        for &v in &addrs {
            s.page_allocate(va(v));
        }
        let root = s.root_register();

        let mut pages: Vec<u64> = addrs.iter().map(|v| v & g.page_mask()).collect();
        pages.sort_unstable();
        pages.dedup();
        for &p in &pages {
            assert!(s.page_deallocate(va(p)), "{g:?}: {p:#x}");
        }

        // only the root table survives
        assert_eq!(s.stats(), SpaceStats { tables: 1, pages: 0 });
        assert_eq!(s.root_register(), root);
        assert_eq!(s.store().stats().live(), 1);
        assert!(s.store().is_live(root.root().unwrap()));
        drop(s);

        let stats = store.stats();
        assert_eq!(stats.allocated, stats.freed, "{g:?}: leaked frames");
        assert_eq!(stats.failed, 0);
    }
}

#[test]
fn neighbours_share_the_leaf_table() {
    let g = Geometry::new(3, 10).unwrap();
    let mut store = CountingStore::new(HostStore);
    let mut s = AddressSpace::new(g, &mut store);

    // identical indices above level 0
    let a = va(0x0123_0400);
    let b = va(0x0123_0C00);
    assert_eq!(g.level_index(a, 1), g.level_index(b, 1));
    assert_eq!(g.level_index(a, 2), g.level_index(b, 2));
    assert_ne!(g.level_index(a, 0), g.level_index(b, 0));

    s.page_allocate(a);
    let after_a = s.store().stats().allocated;
    s.page_allocate(b);

    // only the data page is new
    assert_eq!(s.store().stats().allocated, after_a + 1);
    assert_eq!(s.entry(a, 1), s.entry(b, 1));
    assert_eq!(s.stats(), SpaceStats { tables: 3, pages: 2 });
    assert_ne!(
        s.translate(a).as_u64() & g.page_mask(),
        s.translate(b).as_u64() & g.page_mask()
    );
}

#[test]
fn root_register_lifecycle() {
    let g = Geometry::new(2, 10).unwrap();
    let mut s = AddressSpace::with_geometry(g);
    assert_eq!(s.root_register(), RootRegister::UNINITIALIZED);
    assert_eq!(s.root_register().as_u64(), 0);

    s.page_allocate(va(0x400));
    let root = s.root_register();
    assert!(root.is_initialized());
    assert!(root.root().unwrap().is_aligned(g.page_size()));

    s.page_allocate(va(0x80_0000));
    assert_eq!(s.root_register(), root);

    assert!(s.page_deallocate(va(0x400)));
    assert!(s.page_deallocate(va(0x80_0000)));
    assert_eq!(s.root_register(), root);

    s.clear();
    assert_eq!(s.root_register(), RootRegister::UNINITIALIZED);
}

#[test]
fn entries_use_hardware_layout() {
    let g = Geometry::new(3, 12).unwrap();
    let mut s = AddressSpace::with_geometry(g);
    let v = va(0x4020_3ABC);
    s.page_allocate(v);

    for level in 0..g.levels() {
        let e = s.entry(v, level).unwrap();
        assert!(e.valid());
        assert_eq!(e.reserved(g), 0);
        let base = e.base(g).unwrap();
        assert!(base.is_aligned(g.page_size()));
        assert_eq!(e.into_bits(), base.as_u64() | 1);
    }

    let leaf = s.entry(v, 0).unwrap().base(g).unwrap();
    assert_eq!(s.translate(v), leaf | 0xABC);
}

#[test]
fn separate_spaces_are_independent() {
    let g = Geometry::new(2, 10).unwrap();
    let mut a = AddressSpace::with_geometry(g);
    let mut b = AddressSpace::with_geometry(g);

    a.page_allocate(va(0x400));
    assert!(b.translate(va(0x400)).is_unmapped());
    assert_eq!(b.root_register(), RootRegister::UNINITIALIZED);

    b.page_allocate(va(0x400));
    assert_ne!(a.translate(va(0x400)), b.translate(va(0x400)));
    assert!(a.page_deallocate(va(0x400)));
    assert!(!b.translate(va(0x400)).is_unmapped());
}

#[test]
fn default_space_uses_configured_geometry() {
    let mut s = AddressSpace::default();
    assert_eq!(s.geometry(), Geometry::CONFIGURED);
    s.page_allocate(va(0x400));
    assert!(!s.translate(va(0x400)).is_unmapped());
}
