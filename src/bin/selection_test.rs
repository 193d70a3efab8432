use stucon::selection::{Dimension, SelectionError, SelectionStore, ALL, DIMENSIONS};

// Helper to check a dimension is back to the unconstrained state
fn assert_unconstrained(store: &SelectionStore, dimension: Dimension) {
    let s = store.get(dimension);
    assert_eq!(s.value, ALL, "{} should be All", dimension);
    assert_eq!(s.id, None, "{} id should be None", dimension);
    println!("✓ {} is unconstrained", dimension);
}

fn test_initial_state() {
    println!("\n====== Testing initial state ======");
    let store = SelectionStore::new();
    for &d in DIMENSIONS.iter() {
        assert_unconstrained(&store, d);
    }
    assert!(store.active_dimensions().is_empty());
    println!("✓ Fresh store has no active dimensions");
}

fn test_chain_reset_on_upstream_change() {
    println!("\n====== Testing chain reset ======");
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", Some("2022")).unwrap();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();
    store.set(Dimension::Semester, "3", Some("3")).unwrap();
    store.set(Dimension::Subject, "Math", Some("s1")).unwrap();
    assert_eq!(store.active_dimensions().len(), 4);
    println!("✓ Full chain selected");

    // Changing branch must wipe semester and subject
    store.set(Dimension::Branch, "EC", Some("b2")).unwrap();
    assert_eq!(store.get(Dimension::Scheme).value, "2022");
    assert_eq!(store.get(Dimension::Branch).value, "EC");
    assert_unconstrained(&store, Dimension::Semester);
    assert_unconstrained(&store, Dimension::Subject);
    println!("✓ Branch change reset semester and subject, kept scheme");

    // Changing scheme must wipe everything downstream
    store.set(Dimension::Scheme, "2024", Some("2024")).unwrap();
    assert_unconstrained(&store, Dimension::Branch);
    assert_unconstrained(&store, Dimension::Semester);
    assert_unconstrained(&store, Dimension::Subject);
    println!("✓ Scheme change reset the whole downstream chain");
}

fn test_set_all_cascades() {
    println!("\n====== Testing set to All ======");
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", Some("2022")).unwrap();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();
    store.set(Dimension::Semester, "4", Some("4")).unwrap();

    store.set(Dimension::Branch, ALL, None).unwrap();
    assert_unconstrained(&store, Dimension::Branch);
    assert_unconstrained(&store, Dimension::Semester);
    assert_unconstrained(&store, Dimension::Subject);
    assert_eq!(store.get(Dimension::Scheme).value, "2022");
    println!("✓ Selecting All behaves like reset plus cascade");
}

fn test_rejections_do_not_mutate() {
    println!("\n====== Testing rejected sets ======");
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", Some("2022")).unwrap();
    let before = store.summary();

    let err = store.set(Dimension::Branch, "", None).unwrap_err();
    assert_eq!(err, SelectionError::EmptyValue(Dimension::Branch));
    println!("✓ Empty value rejected");

    let err = store.set(Dimension::Branch, ALL, Some("b1")).unwrap_err();
    assert_eq!(err, SelectionError::IdOnAll(Dimension::Branch));
    println!("✓ Id alongside All rejected");

    // Subject needs branch and semester first
    let err = store
        .set(Dimension::Subject, "Math", Some("s1"))
        .unwrap_err();
    assert_eq!(
        err,
        SelectionError::UnmetPrerequisite {
            dimension: Dimension::Subject,
            missing: Dimension::Branch,
        }
    );
    println!("✓ Subject with unmet prerequisites rejected");

    assert_eq!(store.summary(), before);
    println!("✓ No rejected call mutated the store");
}

fn test_semester_without_branch_is_allowed() {
    println!("\n====== Testing coarse filtering ======");
    // The browse page filters by semester alone; only subject has hard
    // prerequisites.
    let mut store = SelectionStore::new();
    store.set(Dimension::Semester, "4", Some("4")).unwrap();
    assert_eq!(store.get(Dimension::Semester).value, "4");
    println!("✓ Semester can be selected without a branch");
}

fn test_reset_all() {
    println!("\n====== Testing reset_all ======");
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", Some("2022")).unwrap();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();
    store.reset_all();
    for &d in DIMENSIONS.iter() {
        assert_unconstrained(&store, d);
    }
    println!("✓ reset_all cleared every dimension");
}

fn test_chain_invariant_over_sequences() {
    println!("\n====== Testing chain invariant over random-ish sequences ======");
    let mut store = SelectionStore::new();
    let calls: [(Dimension, &str, Option<&str>); 6] = [
        (Dimension::Scheme, "2020", Some("2020")),
        (Dimension::Branch, "CS", Some("b1")),
        (Dimension::Semester, "3", Some("3")),
        (Dimension::Subject, "Math", Some("s1")),
        (Dimension::Semester, "4", Some("4")),
        (Dimension::Scheme, "2022", Some("2022")),
    ];
    for (dim, value, id) in calls {
        store.set(dim, value, id).unwrap();
        for &d in dim.downstream() {
            assert!(store.get(d).is_all());
            assert!(store.get(d).id.is_none());
        }
    }
    println!("✓ Every set left all downstream dimensions unconstrained");
}

fn main() {
    println!("Running selection store tests...");
    test_initial_state();
    test_chain_reset_on_upstream_change();
    test_set_all_cascades();
    test_rejections_do_not_mutate();
    test_semester_without_branch_is_allowed();
    test_reset_all();
    test_chain_invariant_over_sequences();
    println!("\nAll selection store tests passed!");
}
