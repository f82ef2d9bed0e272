//! End-to-end tests for TwinDB.
//!
//! Each test starts a REMOTE site daemon on a loopback port and drives a
//! LOCAL database against it, checking both the statement results and the
//! files left at each site.

use twin_common::{Site, DISTRIBUTED_CATALOG_FILE, PENDING_LOG_FILE};
use twin_server::database::{DatabaseError, StatementResult};
use twin_storage::SiteStorage;
use twin_test::cluster::read_lines;
use twin_test::TwoSiteCluster;

fn rows_of(result: StatementResult) -> Vec<Vec<String>> {
    result.as_query().expect("expected a query result").rows.clone()
}

#[test]
fn test_department_employee_scenario() {
    let cluster = TwoSiteCluster::start().unwrap();
    let db = cluster.open_local().unwrap();
    let mut session = db.create_session().unwrap();

    session
        .execute("CREATE TABLE department (id INT PRIMARY KEY, name TEXT)")
        .unwrap();
    session
        .execute("CREATE TABLE employee (id INT PRIMARY KEY, name TEXT, dept_id INT FOREIGN KEY REFERENCES department(id))")
        .unwrap();

    session
        .execute("INSERT INTO department VALUES (1,'eng')")
        .unwrap();
    session
        .execute("INSERT INTO employee VALUES (1,'alice',1)")
        .unwrap();

    let err = session
        .execute("INSERT INTO employee VALUES (2,'bob',9)")
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ForeignKeyViolation(_)), "{err}");

    let employees = rows_of(session.execute("SELECT * FROM employee").unwrap());
    assert_eq!(employees, vec![vec!["1", "alice", "1"]]);

    let err = session
        .execute("DELETE FROM department WHERE id = 1")
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ForeignKeyViolation(_)), "{err}");

    let departments = rows_of(session.execute("SELECT * FROM department").unwrap());
    assert_eq!(departments, vec![vec!["1", "eng"]]);

    let own = session.sites().own();
    let counts: Vec<(String, u64)> = own
        .read_local_catalog()
        .unwrap()
        .into_iter()
        .map(|info| (info.name, info.row_count))
        .collect();
    assert_eq!(
        counts,
        vec![("department".to_string(), 1), ("employee".to_string(), 1)]
    );
}

#[test]
fn test_foreign_keys_across_sites() {
    let cluster = TwoSiteCluster::start().unwrap();
    let db = cluster.open_local().unwrap();
    let mut session = db.create_session().unwrap();

    let created = session
        .execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT)")
        .unwrap();
    assert_eq!(
        created,
        StatementResult::Created {
            table: "department".to_string(),
            site: Site::Remote,
        }
    );
    session
        .execute("CREATE TABLE employee (id INT PRIMARY KEY, name TEXT, dept_id INT FOREIGN KEY REFERENCES department(id))")
        .unwrap();

    session
        .execute("INSERT INTO department VALUES (1, 'eng')")
        .unwrap();
    session
        .execute("INSERT INTO employee VALUES (1, 'alice', 1)")
        .unwrap();
    assert!(matches!(
        session.execute("INSERT INTO employee VALUES (2, 'bob', 9)"),
        Err(DatabaseError::ForeignKeyViolation(_))
    ));
    assert!(matches!(
        session.execute("DELETE FROM department WHERE id = 1"),
        Err(DatabaseError::ForeignKeyViolation(_))
    ));
    assert!(matches!(
        session.execute("DROP TABLE department"),
        Err(DatabaseError::ForeignKeyViolation(_))
    ));

    // The department rows live only at the REMOTE site.
    assert_eq!(
        read_lines(cluster.remote_dir().join("department.dat")).unwrap(),
        vec!["id|name", "1|eng"]
    );
    assert!(!cluster.local_dir().join("department.dat").exists());

    // Both sites hold the same catalog after the statement is published.
    let expected = vec!["TableName|DatabaseSite", "department|REMOTE", "employee|LOCAL"];
    assert_eq!(
        read_lines(cluster.local_dir().join(DISTRIBUTED_CATALOG_FILE)).unwrap(),
        expected
    );
    assert_eq!(
        read_lines(cluster.remote_dir().join(DISTRIBUTED_CATALOG_FILE)).unwrap(),
        expected
    );

    // Deleting the child first releases the parent.
    session
        .execute("DELETE FROM employee WHERE id = 1")
        .unwrap();
    assert_eq!(
        session
            .execute("DELETE FROM department WHERE id = 1")
            .unwrap(),
        StatementResult::Deleted {
            table: "department".to_string(),
            rows: 1,
        }
    );
}

#[test]
fn test_buffered_transaction_against_remote_table() {
    let cluster = TwoSiteCluster::start().unwrap();
    let db = cluster.open_local().unwrap();
    let mut session = db.create_session().unwrap();

    session
        .execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT)")
        .unwrap();
    session.execute("SET AUTO_COMMIT = FALSE").unwrap();

    for (id, name) in [(1, "eng"), (2, "ops"), (3, "sales")] {
        let result = session
            .execute(&format!("INSERT INTO department VALUES ({id}, '{name}')"))
            .unwrap();
        assert!(matches!(result, StatementResult::Buffered { .. }));
    }

    assert!(rows_of(session.execute("SELECT * FROM department").unwrap()).is_empty());
    assert_eq!(
        read_lines(cluster.local_dir().join(PENDING_LOG_FILE))
            .unwrap()
            .len(),
        3
    );

    let committed = session.execute("COMMIT").unwrap();
    assert_eq!(
        committed,
        StatementResult::Committed {
            replayed: 3,
            failures: Vec::new(),
        }
    );
    assert_eq!(
        rows_of(session.execute("SELECT name FROM department").unwrap()),
        vec![vec!["eng"], vec!["ops"], vec!["sales"]]
    );
    assert!(read_lines(cluster.local_dir().join(PENDING_LOG_FILE))
        .unwrap()
        .is_empty());

    let remote = cluster.remote_files().unwrap();
    assert_eq!(remote.read_data("department").unwrap().len(), 4);
}

#[test]
fn test_remote_outage() {
    let mut cluster = TwoSiteCluster::start().unwrap();
    let db = cluster.open_local().unwrap();
    let mut session = db.create_session().unwrap();

    session
        .execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT)")
        .unwrap();
    session
        .execute("INSERT INTO department VALUES (1, 'eng')")
        .unwrap();

    cluster.stop_remote();

    let err = session.execute("SELECT * FROM department").unwrap_err();
    assert!(matches!(err, DatabaseError::SiteUnreachable(_)), "{err}");

    // LOCAL tables keep working on the cached catalog.
    session
        .execute("CREATE TABLE note (id INT PRIMARY KEY, body TEXT)")
        .unwrap();
    session
        .execute("INSERT INTO note VALUES (1, 'remote is down')")
        .unwrap();
    assert_eq!(
        rows_of(session.execute("SELECT body FROM note").unwrap()),
        vec![vec!["remote is down"]]
    );
}

#[test]
fn test_exports_cover_both_sites() {
    let cluster = TwoSiteCluster::start().unwrap();
    let db = cluster.open_local().unwrap();
    let mut session = db.create_session().unwrap();

    session
        .execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT)")
        .unwrap();
    session
        .execute("CREATE TABLE employee (id INT PRIMARY KEY, dept_id INT FOREIGN KEY REFERENCES department(id))")
        .unwrap();

    let dump = std::fs::read_to_string(db.export_sql_dump().unwrap()).unwrap();
    assert!(dump.contains("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT);"));
    assert!(dump.contains(
        "CREATE TABLE employee NODE LOCAL (id INT PRIMARY KEY, dept_id INT FOREIGN KEY REFERENCES department(id));"
    ));

    let erd = std::fs::read_to_string(db.export_erd().unwrap()).unwrap();
    assert_eq!(
        erd,
        "employee (dept_id) --(*)-------- REFERENCES --------(1)--> department (id)\n"
    );
}
