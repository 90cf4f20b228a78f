use super::*;
use std::io::Write;

#[test]
fn test_parse_subject_field_strips_codes() {
    let subjects = parse_subject_field("Machine Learning (cs.LG); Artificial Intelligence (cs.AI)");
    assert_eq!(subjects, vec!["Machine Learning", "Artificial Intelligence"]);
}

#[test]
fn test_parse_subject_field_without_codes() {
    assert_eq!(parse_subject_field("Robotics"), vec!["Robotics"]);
    assert!(parse_subject_field("  ;  ").is_empty());
}

#[test]
fn test_subject_categories_from_list() {
    let paper = Paper::new("t").with_subjects(vec![
        "Optics (physics.optics)".to_string(),
        "Quantum Physics (quant-ph)".to_string(),
    ]);
    assert_eq!(paper.subject_categories(), vec!["Optics", "Quantum Physics"]);
}

#[test]
fn test_filter_by_categories_intersection() {
    let papers = vec![
        Paper::new("a").with_subjects("Machine Learning (cs.LG); Robotics (cs.RO)"),
        Paper::new("b").with_subjects("Databases (cs.DB)"),
        Paper::new("c").with_subjects("Robotics (cs.RO)"),
    ];

    let kept = filter_by_categories(papers, &["Robotics".to_string()]);
    let titles: Vec<&str> = kept.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "c"]);
}

#[test]
fn test_filter_by_categories_empty_keeps_all() {
    let papers = vec![Paper::new("a"), Paper::new("b")];
    assert_eq!(filter_by_categories(papers, &[]).len(), 2);
}

#[test]
fn test_resolve_topic() {
    assert_eq!(resolve_topic("Computer Science").unwrap(), "cs");
    assert_eq!(resolve_topic("Quantum Physics").unwrap(), "quant-ph");
    assert!(matches!(
        resolve_topic("Physics"),
        Err(PaperError::PhysicsSubtopicRequired)
    ));
    assert!(matches!(
        resolve_topic("Alchemy"),
        Err(PaperError::UnknownTopic { .. })
    ));
}

#[test]
fn test_interest_query_rejects_blank() {
    assert!(InterestQuery::parse("   ").is_none());
    let q = InterestQuery::parse("  robot learning ").unwrap();
    assert_eq!(q.as_str(), "robot learning");
}

#[test]
fn test_text_or_list_display() {
    let list = TextOrList::List(vec!["Ada".into(), " ".into(), "Grace".into()]);
    assert_eq!(list.display(), "Ada, Grace");
    assert!(TextOrList::default().is_empty());
}

#[test]
fn test_paper_deserializes_both_shapes() {
    let raw = r#"[
        {"title": "A", "authors": "Ada Lovelace", "subjects": "Robotics (cs.RO)", "abstract": "x"},
        {"title": "B", "authors": ["Grace Hopper"], "subjects": ["Databases"], "main_page": "https://arxiv.org/abs/1", "pdf": "https://arxiv.org/pdf/1"}
    ]"#;
    let papers: Vec<Paper> = serde_json::from_str(raw).unwrap();
    assert_eq!(papers[0].abstract_text, "x");
    assert_eq!(papers[1].authors.display(), "Grace Hopper");
    assert_eq!(papers[1].pdf.as_deref(), Some("https://arxiv.org/pdf/1"));
}

#[test]
fn test_scored_paper_field_lookup() {
    let scored = ScoredPaper {
        paper: Paper::new("A"),
        relevancy_score: 7,
        analysis: vec![AnalysisField::new("Goal", "speed")],
    };
    assert_eq!(scored.field("Goal"), "speed");
    assert_eq!(scored.field("Data"), "N/A");
    assert_eq!(scored.title(), "A");
}

#[tokio::test]
async fn test_load_papers_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"[{{"title": "A"}}, {{"title": "B"}}]"#).unwrap();

    let papers = load_papers(file.path()).await.unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[1].title, "B");
}

#[tokio::test]
async fn test_load_papers_missing_file() {
    let err = load_papers(std::path::Path::new("/nonexistent/papers.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaperError::Io { .. }));
}

#[tokio::test]
async fn test_load_papers_bad_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();

    let err = load_papers(file.path()).await.unwrap_err();
    assert!(matches!(err, PaperError::Json { .. }));
}
