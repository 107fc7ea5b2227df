use papernest_core::db::open_db_in_memory;
use papernest_core::{
    export_project, import_document, import_project, new_project, project_counts,
    serialize_project, AgendaRepository, Author, DefinitionItem, Event, GroupRepository,
    ImportError, ImportWarning, OrderingService, Paper, PaperRepository, PaperType,
    ProjectDocument, SqliteAgendaRepository, SqliteGroupRepository, SqlitePaperRepository,
    SqliteWorkspaceRepository, TodoItem, WorkspaceRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Root "Methods" with subgroup "Transformers", one root "Surveys",
/// two grouped papers, one ungrouped paper and one record of each kind.
fn seed_project(conn: &Connection) {
    let mut workspace = new_project(conn, "Attention study").unwrap();
    let workspaces = SqliteWorkspaceRepository::try_new(conn).unwrap();
    workspace.research_objective = "Map the literature".to_string();
    workspaces.update_workspace(&workspace).unwrap();

    let ordering = OrderingService::new(
        SqliteGroupRepository::try_new(conn).unwrap(),
        SqlitePaperRepository::try_new(conn).unwrap(),
    );
    let methods = ordering.create_root_group("Methods").unwrap();
    let transformers = ordering.create_subgroup(methods.id, "Transformers").unwrap();
    let surveys = ordering.create_root_group("Surveys").unwrap();
    ordering.set_collapsed(surveys.id, true).unwrap();

    let papers = SqlitePaperRepository::try_new(conn).unwrap();
    let mut attention = Paper::new("Attention Is All You Need");
    attention.short_title = "Transformer".to_string();
    attention.source_url = "https://arxiv.org/abs/1706.03762".to_string();
    attention.authors = vec![Author::new("Ashish", "Vaswani"), Author::new("Noam", "Shazeer")];
    attention
        .notes
        .insert("summary".to_string(), "Self-attention only.".to_string());
    attention.group_id = Some(transformers.id);
    let attention = papers.create_paper(&attention).unwrap();
    papers
        .set_cached_file_path(attention.id, Some("/tmp/cache/1706.03762.pdf"))
        .unwrap();

    let mut survey = Paper::new("A Survey of Transformers");
    survey.paper_type = PaperType::Survey;
    survey.group_id = Some(surveys.id);
    papers.create_paper(&survey).unwrap();

    let mut proof = Paper::new("On the Expressivity of Attention");
    proof.paper_type = PaperType::TheoreticalProof;
    papers.create_paper(&proof).unwrap();

    let agenda = SqliteAgendaRepository::try_new(conn).unwrap();
    agenda
        .create_event(&Event::new("Reading group", Some(1_760_000_000_000)))
        .unwrap();
    let mut todo = TodoItem::new("Annotate section 3");
    todo.is_completed = true;
    agenda.create_todo(&todo).unwrap();
    agenda
        .create_definition(&DefinitionItem::new("Attention", "Weighted sum over values"))
        .unwrap();
}

fn without_cache(mut papers: Vec<Paper>) -> Vec<Paper> {
    for paper in &mut papers {
        paper.cached_file_path = None;
    }
    papers
}

#[test]
fn export_then_import_reproduces_the_project() {
    let source = setup();
    seed_project(&source);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.papernest.json");

    let summary = export_project(&source, &path).unwrap();
    assert_eq!(summary.counts.papers, 3);
    assert_eq!(summary.counts.paper_groups, 3);
    assert!(summary.bytes_written > 0);

    let target = setup();
    let report = import_project(&target, &path).unwrap();
    assert!(report.warnings.is_empty());
    assert!(!report.synthesized_workspace);
    assert_eq!(report.counts, project_counts(&target).unwrap());

    let src_workspace = SqliteWorkspaceRepository::try_new(&source)
        .unwrap()
        .get_workspace()
        .unwrap();
    let dst_workspace = SqliteWorkspaceRepository::try_new(&target)
        .unwrap()
        .get_workspace()
        .unwrap();
    assert_eq!(src_workspace, dst_workspace);

    let src_groups = SqliteGroupRepository::try_new(&source).unwrap();
    let dst_groups = SqliteGroupRepository::try_new(&target).unwrap();
    assert_eq!(
        src_groups.list_all_groups().unwrap(),
        dst_groups.list_all_groups().unwrap()
    );

    let src_papers = SqlitePaperRepository::try_new(&source).unwrap();
    let dst_papers = SqlitePaperRepository::try_new(&target).unwrap();
    let imported = dst_papers.list_all_papers().unwrap();
    assert!(imported.iter().all(|paper| paper.cached_file_path.is_none()));
    assert_eq!(without_cache(src_papers.list_all_papers().unwrap()), imported);

    let src_agenda = SqliteAgendaRepository::try_new(&source).unwrap();
    let dst_agenda = SqliteAgendaRepository::try_new(&target).unwrap();
    assert_eq!(src_agenda.list_events().unwrap(), dst_agenda.list_events().unwrap());
    assert_eq!(src_agenda.list_todos().unwrap(), dst_agenda.list_todos().unwrap());
    assert_eq!(
        src_agenda.list_definitions().unwrap(),
        dst_agenda.list_definitions().unwrap()
    );
}

#[test]
fn serializing_twice_differs_only_in_export_time() {
    let conn = setup();
    seed_project(&conn);

    let mut first = serialize_project(&conn).unwrap();
    let mut second = serialize_project(&conn).unwrap();
    first.exported_at = Default::default();
    second.exported_at = Default::default();
    assert_eq!(first, second);
}

#[test]
fn exported_file_never_contains_cached_paths() {
    let conn = setup();
    seed_project(&conn);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");

    export_project(&conn, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("/tmp/cache"));
    assert!(text.contains("\"parentID\""));
    assert!(text.contains("\"version\": 1"));
}

#[test]
fn export_replaces_existing_file_in_place() {
    let conn = setup();
    seed_project(&conn);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, b"stale").unwrap();

    export_project(&conn, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(ProjectDocument::from_json_slice(&bytes).is_ok());
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn import_replaces_previous_content() {
    let conn = setup();
    seed_project(&conn);
    let document = ProjectDocument::from_json_slice(
        br#"{"version": 1, "papers": [{"title": "Only one"}]}"#,
    )
    .unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert!(report.synthesized_workspace);
    let counts = project_counts(&conn).unwrap();
    assert_eq!(counts.workspaces, 1);
    assert_eq!(counts.papers, 1);
    assert_eq!(counts.paper_groups, 0);
    assert_eq!(counts.events, 0);
}

#[test]
fn dangling_links_are_dropped_with_warnings() {
    let conn = setup();
    let ghost = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    let paper_id = Uuid::new_v4();
    let json = format!(
        r#"{{
            "paperGroups": [{{"id": "{group_id}", "name": "Orphan", "parentID": "{ghost}"}}],
            "papers": [{{"id": "{paper_id}", "title": "Lost", "groupID": "{ghost}"}}]
        }}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert_eq!(
        report.warnings,
        vec![
            ImportWarning::DanglingGroupParent {
                group_id,
                parent_id: ghost
            },
            ImportWarning::DanglingPaperGroup {
                paper_id,
                group_id: ghost
            },
        ]
    );
    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    let stored = groups.get_group(group_id).unwrap().unwrap();
    assert_eq!(stored.parent_id, None);
    let papers = SqlitePaperRepository::try_new(&conn).unwrap();
    assert_eq!(papers.get_paper(paper_id).unwrap().unwrap().group_id, None);
}

#[test]
fn nesting_deeper_than_two_levels_is_flattened() {
    let conn = setup();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{"paperGroups": [
            {{"id": "{a}", "name": "A"}},
            {{"id": "{b}", "name": "B", "parentID": "{a}"}},
            {{"id": "{c}", "name": "C", "parentID": "{b}"}}
        ]}}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert_eq!(
        report.warnings,
        vec![ImportWarning::DepthExceeded {
            group_id: c,
            parent_id: b
        }]
    );
    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    assert_eq!(groups.get_group(b).unwrap().unwrap().parent_id, Some(a));
    assert_eq!(groups.get_group(c).unwrap().unwrap().parent_id, None);
}

#[test]
fn overlong_chain_keeps_links_under_groups_that_became_roots() {
    let conn = setup();
    let (z, a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{"paperGroups": [
            {{"id": "{c}", "name": "C", "parentID": "{b}"}},
            {{"id": "{b}", "name": "B", "parentID": "{a}"}},
            {{"id": "{a}", "name": "A", "parentID": "{z}"}},
            {{"id": "{z}", "name": "Z"}}
        ]}}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert_eq!(
        report.warnings,
        vec![ImportWarning::DepthExceeded {
            group_id: b,
            parent_id: a
        }]
    );
    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    let parent_of = |id| groups.get_group(id).unwrap().unwrap().parent_id;
    assert_eq!(parent_of(z), None);
    assert_eq!(parent_of(a), Some(z));
    assert_eq!(parent_of(b), None);
    assert_eq!(parent_of(c), Some(b));
}

#[test]
fn parent_cycles_are_broken_without_failing() {
    let conn = setup();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{"paperGroups": [
            {{"id": "{a}", "name": "A", "parentID": "{b}"}},
            {{"id": "{b}", "name": "B", "parentID": "{a}"}}
        ]}}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert_eq!(
        report.warnings,
        vec![ImportWarning::DepthExceeded {
            group_id: b,
            parent_id: a
        }]
    );
    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    assert_eq!(groups.get_group(a).unwrap().unwrap().parent_id, Some(b));
    assert_eq!(groups.get_group(b).unwrap().unwrap().parent_id, None);
}

#[test]
fn sparse_indices_are_renumbered_densely() {
    let conn = setup();
    let group_id = Uuid::new_v4();
    let (first, second, third) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{
            "paperGroups": [{{"id": "{group_id}", "name": "G", "orderIndex": 7}}],
            "papers": [
                {{"id": "{third}", "groupID": "{group_id}", "sortIndex": 40}},
                {{"id": "{first}", "groupID": "{group_id}", "sortIndex": 3}},
                {{"id": "{second}", "groupID": "{group_id}", "sortIndex": 10}}
            ]
        }}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    import_document(&conn, &document).unwrap();

    let papers = SqlitePaperRepository::try_new(&conn).unwrap();
    let order: Vec<(Uuid, i32)> = papers
        .list_papers(Some(group_id))
        .unwrap()
        .into_iter()
        .map(|paper| (paper.id, paper.sort_index))
        .collect();
    assert_eq!(order, vec![(first, 0), (second, 1), (third, 2)]);
    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    assert_eq!(groups.get_group(group_id).unwrap().unwrap().order_index, 0);
}

#[test]
fn extra_workspaces_are_ignored() {
    let conn = setup();
    let (kept, extra) = (Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{"workspaces": [
            {{"id": "{kept}", "projectTitle": "Kept"}},
            {{"id": "{extra}", "projectTitle": "Extra"}}
        ]}}"#
    );
    let document = ProjectDocument::from_json_slice(json.as_bytes()).unwrap();

    let report = import_document(&conn, &document).unwrap();

    assert_eq!(
        report.warnings,
        vec![ImportWarning::ExtraWorkspace { workspace_id: extra }]
    );
    let workspace = SqliteWorkspaceRepository::try_new(&conn)
        .unwrap()
        .get_workspace()
        .unwrap()
        .unwrap();
    assert_eq!(workspace.id, kept);
    assert_eq!(project_counts(&conn).unwrap().workspaces, 1);
}

#[test]
fn malformed_file_leaves_store_untouched() {
    let conn = setup();
    seed_project(&conn);
    let before = project_counts(&conn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{\"papers\": [").unwrap();

    let err = import_project(&conn, &path).unwrap_err();

    assert!(matches!(err, ImportError::Malformed(_)));
    assert_eq!(project_counts(&conn).unwrap(), before);
}

#[test]
fn invalid_documents_are_rejected_before_the_wipe() {
    let conn = setup();
    seed_project(&conn);
    let before = project_counts(&conn).unwrap();
    let duplicate = Uuid::new_v4();
    let cases = [
        r#"{"version": 2}"#.to_string(),
        r#"{"version": 0}"#.to_string(),
        r#"{"papers": [{"authorsJSON": "not json"}]}"#.to_string(),
        format!(r#"{{"papers": [{{"id": "{duplicate}"}}, {{"id": "{duplicate}"}}]}}"#),
    ];

    for case in cases {
        let document = ProjectDocument::from_json_slice(case.as_bytes()).unwrap();
        let err = import_document(&conn, &document).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)), "{case}");
    }
    assert_eq!(project_counts(&conn).unwrap(), before);
}

#[test]
fn unreadable_path_is_reported() {
    let conn = setup();
    let dir = tempfile::tempdir().unwrap();

    let err = import_project(&conn, dir.path().join("missing.json")).unwrap_err();

    assert!(matches!(err, ImportError::Unreadable { .. }));
}
