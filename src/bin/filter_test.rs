use stucon::filter::{filter_documents, Document, FilterOptions};
use stucon::selection::{Dimension, SelectionStore};

fn doc(id: u64, scheme: &str, branch: &str, semester: &str, subject: &str) -> Document {
    Document {
        id,
        title: format!("Document {id}"),
        scheme: scheme.to_string(),
        branch: branch.to_string(),
        semester: semester.to_string(),
        subject: subject.to_string(),
        upload_date: "2024-09-10".to_string(),
        file_type: "PDF".to_string(),
        download_url: String::new(),
    }
}

fn sample_docs() -> Vec<Document> {
    vec![
        doc(1, "2022", "CS", "3", "Math"),
        doc(2, "2022", "CS", "4", "OS"),
        doc(3, "2020", "EC", "2", "Physics"),
        doc(4, "2022", "EC", "6", "Networks"),
    ]
}

fn ids(docs: &[&Document]) -> Vec<u64> {
    docs.iter().map(|d| d.id).collect()
}

fn test_unconstrained_is_identity() {
    println!("\n====== Testing identity on unconstrained store ======");
    let docs = sample_docs();
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", None).unwrap();
    store.reset_all();

    let visible = filter_documents(&store, &docs, FilterOptions::default());
    assert_eq!(ids(&visible), vec![1, 2, 3, 4]);
    println!("✓ reset_all then filter returns everything in original order");
}

fn test_partial_chain_filtering() {
    println!("\n====== Testing partial chain filtering ======");
    let docs = vec![doc(1, "2022", "CS", "3", "Math"), doc(2, "2022", "CS", "4", "OS")];
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", None).unwrap();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();

    let visible = filter_documents(&store, &docs, FilterOptions::default());
    assert_eq!(ids(&visible), vec![1, 2]);
    println!("✓ scheme=2022, branch=CS matches both documents");

    store.set(Dimension::Semester, "4", Some("4")).unwrap();
    let visible = filter_documents(&store, &docs, FilterOptions::default());
    assert_eq!(ids(&visible), vec![2]);
    println!("✓ Adding semester=4 narrows to the second document");
}

fn test_predicate_correctness() {
    println!("\n====== Testing predicate correctness ======");
    let docs = sample_docs();
    let mut store = SelectionStore::new();
    store.set(Dimension::Branch, "EC", Some("b2")).unwrap();

    let visible = filter_documents(&store, &docs, FilterOptions::default());
    for d in &docs {
        let included = visible.iter().any(|v| v.id == d.id);
        assert_eq!(included, d.branch == "EC", "document {}", d.id);
    }
    println!("✓ Exactly the documents matching every active dimension survive");
}

fn test_case_sensitivity() {
    println!("\n====== Testing case sensitivity ======");
    let docs = vec![doc(1, "2022", "CS", "3", "math")];
    let mut store = SelectionStore::new();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();
    store.set(Dimension::Semester, "3", Some("3")).unwrap();
    store.set(Dimension::Subject, "Math", Some("s1")).unwrap();

    let strict = filter_documents(&store, &docs, FilterOptions::default());
    assert!(strict.is_empty());
    println!("✓ Case-sensitive by default: \"Math\" does not match \"math\"");

    let folded = filter_documents(
        &store,
        &docs,
        FilterOptions {
            case_insensitive: true,
        },
    );
    assert_eq!(ids(&folded), vec![1]);
    println!("✓ case_insensitive option matches across case");
}

fn test_missing_field_never_matches() {
    println!("\n====== Testing missing fields ======");
    // A document deserialized without a subject field gets the empty string
    let stray: Document = serde_json::from_str(
        r#"{"id": 9, "title": "No subject", "scheme": "2022", "branch": "CS", "semester": "3"}"#,
    )
    .unwrap();
    assert_eq!(stray.subject, "");

    let mut store = SelectionStore::new();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();
    store.set(Dimension::Semester, "3", Some("3")).unwrap();
    store.set(Dimension::Subject, "Math", Some("s1")).unwrap();

    let docs = vec![stray];
    let visible = filter_documents(&store, &docs, FilterOptions::default());
    assert!(visible.is_empty());
    println!("✓ A document missing the filtered field never matches");
}

fn test_idempotence() {
    println!("\n====== Testing idempotence ======");
    let docs = sample_docs();
    let mut store = SelectionStore::new();
    store.set(Dimension::Scheme, "2022", None).unwrap();

    let once: Vec<Document> = filter_documents(&store, &docs, FilterOptions::default())
        .into_iter()
        .cloned()
        .collect();
    let twice = filter_documents(&store, &once, FilterOptions::default());
    assert_eq!(
        ids(&twice),
        once.iter().map(|d| d.id).collect::<Vec<_>>()
    );
    println!("✓ Filtering twice with the same selection changes nothing");
}

fn test_order_preserved() {
    println!("\n====== Testing stable ordering ======");
    // Deliberately unsorted input; the filter must not reorder it
    let docs = vec![
        doc(42, "2022", "CS", "3", "Math"),
        doc(7, "2022", "CS", "3", "Math"),
        doc(19, "2022", "CS", "3", "Math"),
    ];
    let mut store = SelectionStore::new();
    store.set(Dimension::Branch, "CS", Some("b1")).unwrap();

    let visible = filter_documents(&store, &docs, FilterOptions::default());
    assert_eq!(ids(&visible), vec![42, 7, 19]);
    println!("✓ Output preserves input order");
}

fn test_wire_field_names() {
    println!("\n====== Testing document wire format ======");
    let d = doc(1, "2022", "CS", "3", "Math");
    let json = serde_json::to_value(&d).unwrap();
    assert!(json.get("uploadDate").is_some());
    assert!(json.get("fileType").is_some());
    assert!(json.get("downloadUrl").is_some());
    println!("✓ Documents serialize with the backend's camelCase field names");
}

fn main() {
    println!("Running filter predicate tests...");
    test_unconstrained_is_identity();
    test_partial_chain_filtering();
    test_predicate_correctness();
    test_case_sensitivity();
    test_missing_field_never_matches();
    test_idempotence();
    test_order_preserved();
    test_wire_field_names();
    println!("\nAll filter predicate tests passed!");
}
