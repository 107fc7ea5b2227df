use papernest_core::db::open_db_in_memory;
use papernest_core::{
    GroupId, OrderingError, OrderingService, Paper, PaperId, PaperRepository,
    SqliteGroupRepository, SqlitePaperRepository,
};
use rusqlite::Connection;

type Ordering<'conn> = OrderingService<SqliteGroupRepository<'conn>, SqlitePaperRepository<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> Ordering<'_> {
    OrderingService::new(
        SqliteGroupRepository::try_new(conn).unwrap(),
        SqlitePaperRepository::try_new(conn).unwrap(),
    )
}

fn add_paper(conn: &Connection, title: &str, group_id: Option<GroupId>) -> PaperId {
    let repo = SqlitePaperRepository::try_new(conn).unwrap();
    let mut paper = Paper::new(title);
    paper.group_id = group_id;
    repo.create_paper(&paper).unwrap().id
}

fn paper_order(service: &Ordering<'_>, group_id: Option<GroupId>) -> Vec<(PaperId, i32)> {
    service
        .list_papers(group_id)
        .unwrap()
        .into_iter()
        .map(|paper| (paper.id, paper.sort_index))
        .collect()
}

#[test]
fn created_groups_and_papers_append_densely() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_root_group("A").unwrap();
    let b = service.create_root_group("  B  ").unwrap();
    assert_eq!(a.order_index, 0);
    assert_eq!(b.order_index, 1);
    assert_eq!(b.name, "B");

    let p1 = add_paper(&conn, "P1", Some(a.id));
    let p2 = add_paper(&conn, "P2", Some(a.id));
    let p3 = add_paper(&conn, "P3", None);

    assert_eq!(paper_order(&service, Some(a.id)), vec![(p1, 0), (p2, 1)]);
    assert_eq!(paper_order(&service, None), vec![(p3, 0)]);
}

#[test]
fn blank_group_name_is_rejected() {
    let conn = setup();
    let service = service(&conn);

    let err = service.create_root_group("   ").unwrap_err();
    assert!(matches!(err, OrderingError::InvalidName));
    assert!(service.list_groups(None).unwrap().is_empty());
}

#[test]
fn subgroup_of_subgroup_is_rejected() {
    let conn = setup();
    let service = service(&conn);

    let root = service.create_root_group("Root").unwrap();
    let sub = service.create_subgroup(root.id, "Sub").unwrap();
    assert_eq!(sub.parent_id, Some(root.id));

    let err = service.create_subgroup(sub.id, "Too deep").unwrap_err();
    match err {
        OrderingError::InvalidDepth { parent_id } => assert_eq!(parent_id, sub.id),
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_groups(Some(sub.id)).unwrap().is_empty());
}

#[test]
fn deleting_root_group_promotes_subgroups_and_keeps_their_papers() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_root_group("A").unwrap();
    let a1 = service.create_subgroup(a.id, "A1").unwrap();
    let p1 = add_paper(&conn, "P1", Some(a1.id));
    let p2 = add_paper(&conn, "P2", None);

    let outcome = service.delete_group(a.id).unwrap();
    assert_eq!(outcome.promoted_subgroups, vec![a1.id]);
    assert_eq!(outcome.reparented_papers, 0);

    let roots = service.list_groups(None).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, a1.id);
    assert_eq!(roots[0].order_index, 0);
    assert_eq!(roots[0].parent_id, None);

    assert_eq!(paper_order(&service, Some(a1.id)), vec![(p1, 0)]);
    assert_eq!(paper_order(&service, None), vec![(p2, 0)]);
}

#[test]
fn deleting_group_appends_its_papers_to_parent_scope() {
    let conn = setup();
    let service = service(&conn);

    let keep = service.create_root_group("Keep").unwrap();
    let gone = service.create_root_group("Gone").unwrap();
    let promoted = service.create_subgroup(gone.id, "Promoted").unwrap();
    let loose = add_paper(&conn, "Loose", None);
    let member_a = add_paper(&conn, "Member A", Some(gone.id));
    let member_b = add_paper(&conn, "Member B", Some(gone.id));

    let outcome = service.delete_group(gone.id).unwrap();
    assert_eq!(outcome.reparented_papers, 2);

    assert_eq!(
        paper_order(&service, None),
        vec![(loose, 0), (member_a, 1), (member_b, 2)]
    );
    let roots: Vec<(GroupId, i32)> = service
        .list_groups(None)
        .unwrap()
        .into_iter()
        .map(|group| (group.id, group.order_index))
        .collect();
    assert_eq!(roots, vec![(keep.id, 0), (promoted.id, 1)]);
}

#[test]
fn deleting_subgroup_moves_papers_to_its_root() {
    let conn = setup();
    let service = service(&conn);

    let root = service.create_root_group("Root").unwrap();
    let first = service.create_subgroup(root.id, "First").unwrap();
    let second = service.create_subgroup(root.id, "Second").unwrap();
    let at_root = add_paper(&conn, "At root", Some(root.id));
    let in_first = add_paper(&conn, "In first", Some(first.id));

    service.delete_group(first.id).unwrap();

    assert_eq!(
        paper_order(&service, Some(root.id)),
        vec![(at_root, 0), (in_first, 1)]
    );
    let subs = service.list_groups(Some(root.id)).unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].id, second.id);
    assert_eq!(subs[0].order_index, 0);
}

#[test]
fn moving_paper_before_anchor_renumbers_scope() {
    let conn = setup();
    let service = service(&conn);

    let g = service.create_root_group("G").unwrap();
    let p1 = add_paper(&conn, "P1", Some(g.id));
    let p2 = add_paper(&conn, "P2", Some(g.id));

    service.move_paper(p2, Some(g.id), Some(p1)).unwrap();

    assert_eq!(paper_order(&service, Some(g.id)), vec![(p2, 0), (p1, 1)]);
}

#[test]
fn moving_paper_across_groups_renumbers_both_scopes() {
    let conn = setup();
    let service = service(&conn);

    let source = service.create_root_group("Source").unwrap();
    let target = service.create_root_group("Target").unwrap();
    let s0 = add_paper(&conn, "S0", Some(source.id));
    let s1 = add_paper(&conn, "S1", Some(source.id));
    let s2 = add_paper(&conn, "S2", Some(source.id));
    let t0 = add_paper(&conn, "T0", Some(target.id));

    service.move_paper(s0, Some(target.id), None).unwrap();

    assert_eq!(paper_order(&service, Some(source.id)), vec![(s1, 0), (s2, 1)]);
    assert_eq!(paper_order(&service, Some(target.id)), vec![(t0, 0), (s0, 1)]);
}

#[test]
fn moving_paper_out_of_every_group_makes_it_ungrouped() {
    let conn = setup();
    let service = service(&conn);

    let g = service.create_root_group("G").unwrap();
    let p = add_paper(&conn, "P", Some(g.id));
    let loose = add_paper(&conn, "Loose", None);

    service.move_paper(p, None, Some(loose)).unwrap();

    assert_eq!(paper_order(&service, None), vec![(p, 0), (loose, 1)]);
    assert!(paper_order(&service, Some(g.id)).is_empty());
}

#[test]
fn moving_paper_onto_itself_keeps_position() {
    let conn = setup();
    let service = service(&conn);

    let p1 = add_paper(&conn, "P1", None);
    let p2 = add_paper(&conn, "P2", None);
    let p3 = add_paper(&conn, "P3", None);

    service.move_paper(p2, None, Some(p2)).unwrap();

    assert_eq!(paper_order(&service, None), vec![(p1, 0), (p2, 1), (p3, 2)]);
}

#[test]
fn anchor_from_other_scope_is_rejected_without_mutation() {
    let conn = setup();
    let service = service(&conn);

    let g = service.create_root_group("G").unwrap();
    let grouped = add_paper(&conn, "Grouped", Some(g.id));
    let loose = add_paper(&conn, "Loose", None);

    let err = service.move_paper(loose, Some(g.id), Some(grouped)).unwrap_err();
    assert!(matches!(err, OrderingError::NotInScope { .. }));

    let err = service.move_paper(grouped, None, Some(grouped)).unwrap_err();
    assert!(matches!(err, OrderingError::NotInScope { .. }));

    assert_eq!(paper_order(&service, Some(g.id)), vec![(grouped, 0)]);
    assert_eq!(paper_order(&service, None), vec![(loose, 0)]);
}

#[test]
fn unknown_ids_are_not_found() {
    let conn = setup();
    let service = service(&conn);
    let p = add_paper(&conn, "P", None);
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        service.move_paper(missing, None, None).unwrap_err(),
        OrderingError::NotFound(id) if id == missing
    ));
    assert!(matches!(
        service.move_paper(p, Some(missing), None).unwrap_err(),
        OrderingError::NotFound(id) if id == missing
    ));
    assert!(matches!(
        service.delete_group(missing).unwrap_err(),
        OrderingError::NotFound(id) if id == missing
    ));
}

#[test]
fn move_group_reorders_siblings_only() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_root_group("A").unwrap();
    let b = service.create_root_group("B").unwrap();
    let c = service.create_root_group("C").unwrap();
    let a1 = service.create_subgroup(a.id, "A1").unwrap();

    service.move_group(c.id, Some(a.id)).unwrap();
    let roots: Vec<GroupId> = service
        .list_groups(None)
        .unwrap()
        .into_iter()
        .map(|group| group.id)
        .collect();
    assert_eq!(roots, vec![c.id, a.id, b.id]);

    service.move_group(c.id, None).unwrap();
    let indexed: Vec<(GroupId, i32)> = service
        .list_groups(None)
        .unwrap()
        .into_iter()
        .map(|group| (group.id, group.order_index))
        .collect();
    assert_eq!(indexed, vec![(a.id, 0), (b.id, 1), (c.id, 2)]);

    let err = service.move_group(a1.id, Some(b.id)).unwrap_err();
    assert!(matches!(err, OrderingError::NotInScope { .. }));
}

#[test]
fn rename_and_collapse_round_trip() {
    let conn = setup();
    let service = service(&conn);

    let g = service.create_root_group("Draft").unwrap();
    service.rename_group(g.id, "Final").unwrap();
    assert!(service.toggle_collapsed(g.id).unwrap());
    assert!(!service.toggle_collapsed(g.id).unwrap());
    service.set_collapsed(g.id, true).unwrap();

    let stored = service.list_groups(None).unwrap().remove(0);
    assert_eq!(stored.name, "Final");
    assert!(stored.is_collapsed);

    assert!(matches!(
        service.rename_group(g.id, " ").unwrap_err(),
        OrderingError::InvalidName
    ));
}

#[test]
fn group_tree_nests_subgroups_in_order() {
    let conn = setup();
    let service = service(&conn);

    let a = service.create_root_group("A").unwrap();
    let b = service.create_root_group("B").unwrap();
    let a1 = service.create_subgroup(a.id, "A1").unwrap();
    let a2 = service.create_subgroup(a.id, "A2").unwrap();
    service.move_group(a2.id, Some(a1.id)).unwrap();

    let tree = service.group_tree().unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].group.id, a.id);
    let subs: Vec<GroupId> = tree[0].subgroups.iter().map(|group| group.id).collect();
    assert_eq!(subs, vec![a2.id, a1.id]);
    assert_eq!(tree[1].group.id, b.id);
    assert!(tree[1].subgroups.is_empty());
}

#[test]
fn deleting_paper_closes_the_gap() {
    let conn = setup();
    let service = service(&conn);
    let repo = SqlitePaperRepository::try_new(&conn).unwrap();

    let p1 = add_paper(&conn, "P1", None);
    let p2 = add_paper(&conn, "P2", None);
    let p3 = add_paper(&conn, "P3", None);
    repo.delete_paper(p2).unwrap();

    assert_eq!(paper_order(&service, None), vec![(p1, 0), (p3, 1)]);
}
