// src/tests/pipeline_tests/run_tests.rs
use chrono::NaiveDate;

use crate::domain::{AppointmentStatus, DateRange, FilterMode};
use crate::pipeline::run_with_retry;
use crate::scraper::RetryPolicy;
use crate::spreadsheets::csv_writer::{header_for, read_back};
use crate::tests::utils::*;

const ANY: &str = r#""date":"any""#;
const UNSCHEDULED: &str = r#""date":"null""#;

fn site_with_exports(any_body: &str, unscheduled_body: &str) -> FakeTransport {
    let fake = logged_in_site();
    fake.on_post_with("wp-admin/admin-ajax.php", ANY, 200, any_body)
        .on_post_with("wp-admin/admin-ajax.php", UNSCHEDULED, 200, unscheduled_body);
    fake
}

#[test]
fn overlapping_exports_merge_into_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let fake = site_with_exports(
        "ID,Appointment date,Status\n1,2025-06-14 10:00:00,Approved\n2,2025-06-14 11:00:00,Approved\n",
        "ID,Appointment date,Status\n2,2025-06-14 11:00:00,Approved\n3,2025-06-15 12:00:00,Approved\n",
    );

    let report = run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.windows, 2);
    assert_eq!(report.outcome.rows, 3);
    assert_eq!(report.stats.rows_seen, 4);
    assert_eq!(report.stats.duplicates_removed, 1);

    let records = read_back(&settings.output_path).unwrap();
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(records.iter().all(|r| r.status == "approved"));

    let text = std::fs::read_to_string(&settings.output_path).unwrap();
    assert_eq!(text.lines().next().unwrap(), header_for(&settings.custom_fields).join(","));
}

#[test]
fn malformed_rows_are_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let fake = site_with_exports(
        "ID,Appointment date,Customer name\n\
         1,2025-06-14 10:00:00,Ana\n\
         ,2025-06-14 11:00:00,No Id\n\
         3,someday,Bad Date\n\
         4,2025-06-15 09:00:00,Ben\n",
        "ID,Appointment date,Customer name\n",
    );

    let report = run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.stats.rows_skipped, 2);
    assert_eq!(report.outcome.rows, 2);
    let names: Vec<String> = read_back(&settings.output_path)
        .unwrap()
        .into_iter()
        .map(|r| r.customer_name)
        .collect();
    assert_eq!(names, vec!["Ana", "Ben"]);
}

#[test]
fn missing_token_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());

    let fake = FakeTransport::new();
    let ajax = format!("{BASE}/wp-admin/admin-ajax.php");
    fake.on_get("wp-login.php", 200, &format!("{BASE}/wp-login.php"), LOGIN_FORM)
        .on_post("wp-login.php", 200, &format!("{BASE}/wp-admin/"), DASHBOARD)
        .on_get(
            "page=bookly-appointments",
            200,
            &format!("{BASE}/wp-admin/admin.php?page=bookly-appointments"),
            TOKENLESS_PAGE,
        )
        .on_post("admin-ajax.php", 200, &ajax, "ID,Appointment date\n5,2025-06-14\n");

    let report = run_with_retry(&settings, Box::new(fake.clone()), &RetryPolicy::immediate(1)).unwrap();

    assert!(!report.token_found);
    assert_eq!(report.outcome.rows, 1);
    let exports: Vec<_> = fake
        .requests()
        .into_iter()
        .filter(|r| r.url == ajax)
        .collect();
    assert_eq!(exports.len(), 2);
    assert!(exports.iter().all(|r| r.field("csrf_token").is_none()));
}

#[test]
fn client_mode_filters_after_broad_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.filter_mode = FilterMode::Client;
    settings.statuses = vec![AppointmentStatus::Approved];

    let fake = site_with_exports(
        "ID,Appointment date,Status\n1,2025-06-14,Approved\n2,2025-06-14,Cancelled\n",
        "ID,Appointment date,Status\n",
    );

    let report = run_with_retry(&settings, Box::new(fake.clone()), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.outcome.rows, 1);
    assert_eq!(report.stats.filtered_out, 1);
    // the request itself asked for every status
    let first = fake
        .requests()
        .into_iter()
        .find(|r| r.url.ends_with("admin-ajax.php"))
        .unwrap();
    assert!(first.field("filter").unwrap().contains("cancelled"));
}

#[test]
fn empty_export_still_writes_header() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let fake = site_with_exports("ID,Appointment date\n", "ID,Appointment date\n");

    let report = run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.outcome.rows, 0);
    assert_eq!(
        std::fs::read_to_string(&settings.output_path).unwrap(),
        format!("{}\n", header_for(&settings.custom_fields).join(","))
    );
}

#[test]
fn undated_bookings_from_the_second_request_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let fake = site_with_exports(
        "ID,Appointment date,Customer name\n1,2025-06-14 10:00:00,Ana\n",
        "ID,Appointment date,Customer name\n2,,Undated Guest\n",
    );

    let report = run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.stats.rows_skipped, 0);
    let records = read_back(&settings.output_path).unwrap();
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(records[1].date, None);
    assert_eq!(records[1].customer_name, "Undated Guest");

    let text = std::fs::read_to_string(&settings.output_path).unwrap();
    assert!(text.lines().any(|line| line.starts_with("2,,,")));
}

#[test]
fn client_mode_with_a_range_filters_out_undated_bookings() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.filter_mode = FilterMode::Client;
    settings.date_range = Some(
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        )
        .unwrap(),
    );
    let fake = site_with_exports(
        "ID,Appointment date,Status\n1,2025-06-14,Approved\n",
        "ID,Appointment date,Status\n2,,Pending\n",
    );

    let report = run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    assert_eq!(report.outcome.rows, 1);
    assert_eq!(report.stats.filtered_out, 1);
    assert_eq!(report.stats.rows_skipped, 0);
}

#[test]
fn custom_fields_land_in_named_columns() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let fake = site_with_exports(
        "ID,Appointment date,Customer name,Dance role,Country,T-shirt size\n\
         1,2025-06-14 10:00:00,Ana,Follower,Portugal,M\n\
         2,2025-06-14 11:00:00,Ben,Leader,,\n",
        "ID,Appointment date,Customer name\n",
    );

    run_with_retry(&settings, Box::new(fake), &RetryPolicy::immediate(1)).unwrap();

    let text = std::fs::read_to_string(&settings.output_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].ends_with(",Online meeting,Role,Country,Custom fields"));
    assert!(lines[1].ends_with(",Follower,Portugal,T-shirt size: M"));
    assert!(lines[2].ends_with(",Leader,,"));
}
