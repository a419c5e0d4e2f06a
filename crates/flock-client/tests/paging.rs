// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batches and cursors against a recording endpoint.

use flock_client::{
    EdgeSelectionBuilder, Error, FlockClient, SelectionBuilder, SelectionQuery,
};
use flock_dry_tests::{edge, edge_results, results, RecordingEndpoint};
use flock_proto::wire::Call;
use flock_proto::Direction::{Backward, Forward};
use flock_proto::{EdgeQuery, Page, QueryTerm, SelectQuery};

fn select2_queries(call: Option<Call>) -> Vec<SelectQuery> {
    match call {
        Some(Call::Select2 { queries }) => queries,
        other => panic!("expected select2, got {other:?}"),
    }
}

fn select_edges_queries(call: Option<Call>) -> Vec<EdgeQuery> {
    match call {
        Some(Call::SelectEdges { queries }) => queries,
        other => panic!("expected select_edges, got {other:?}"),
    }
}

#[test]
fn two_slot_batch_yields_one_cursor_per_slot_in_order() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[123, 5], 0, -1), results(&[4, 12], 0, -1)]);

    let pages = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .with_page_size(5)
        .select(&SelectionQuery::simple(1, 2, Forward, &[]))
        .with_page_size(5)
        .execute()
        .unwrap();

    assert_eq!(endpoint.calls().len(), 1);
    let sent = select2_queries(endpoint.last_call());
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|q| q.page == Page::new(5, -1)));

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].iter().copied().collect::<Vec<_>>(), vec![123, 5]);
    assert_eq!(pages[1].iter().copied().collect::<Vec<_>>(), vec![4, 12]);
    for page in &pages {
        assert!(!page.has_next_page());
        assert!(!page.has_previous_page());
    }
    assert_eq!(pages[0].query(), &sent[0]);
    assert_eq!(pages[1].query(), &sent[1]);
}

#[test]
fn next_page_reissues_the_query_at_the_next_cursor() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[1, 2], 10, -1)]);
    endpoint.push_select2(vec![results(&[3], 0, 10)]);

    let first = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .with_page_size(15)
        .with_page_start_cursor(99)
        .execute()
        .unwrap()
        .remove(0);
    assert!(first.has_next_page());

    let second = first.next_page().unwrap();
    let sent = select2_queries(endpoint.last_call());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].page, Page::new(15, 10));
    assert_eq!(sent[0].operations, first.query().operations);

    assert_eq!(second.ids(), &[3]);
    assert!(!second.has_next_page());
    assert!(second.has_previous_page());
    assert_eq!(second.query().page.cursor, 10);

    // the original cursor is untouched
    assert_eq!(first.ids(), &[1, 2]);
    assert_eq!(first.query().page, Page::new(15, 99));
}

#[test]
fn previous_page_reissues_the_query_at_the_previous_cursor() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[7], 0, 4)]);
    endpoint.push_select2(vec![results(&[5, 6], 4, -1)]);

    let page = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Backward, &[]))
        .execute()
        .unwrap()
        .remove(0);
    assert!(page.has_previous_page());

    let before = page.previous_page().unwrap();
    assert_eq!(select2_queries(endpoint.last_call())[0].page.cursor, 4);
    assert_eq!(before.ids(), &[5, 6]);
    assert!(!before.has_previous_page());
}

#[test]
fn pages_walks_forward_until_the_last_page() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[1], 2, -1)]);
    endpoint.push_select2(vec![results(&[2], 3, 2)]);
    endpoint.push_select2(vec![results(&[3], 0, 3)]);

    let first = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .with_page_size(1)
        .execute()
        .unwrap()
        .remove(0);

    let ids: Vec<i64> = first
        .pages()
        .flat_map(|page| page.unwrap().into_items())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(endpoint.calls().len(), 3);
}

#[test]
fn pages_stops_after_the_first_error() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[1], 2, -1)]);

    let first = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .execute()
        .unwrap()
        .remove(0);
    endpoint.fail_with_transport("deadline exceeded");

    let mut pages = first.pages();
    assert!(pages.next().unwrap().is_ok());
    assert!(pages.next().unwrap().unwrap_err().is_transport());
    assert!(pages.next().is_none());
    assert_eq!(endpoint.calls().len(), 2);
}

#[test]
fn iteration_is_restartable_and_never_fetches() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[8, 9], 5, -1)]);

    let page = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .execute()
        .unwrap()
        .remove(0);

    let first_pass: Vec<_> = page.iter().collect();
    let second_pass: Vec<_> = (&page).into_iter().collect();
    assert_eq!(first_pass, second_pass);
    assert_eq!(page.len(), 2);
    assert_eq!(endpoint.calls().len(), 1);
}

#[test]
fn repeated_execute_reissues_the_current_slots() {
    let endpoint = RecordingEndpoint::new();
    let batch = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]));

    batch.execute().unwrap();
    batch.execute().unwrap();

    let calls = endpoint.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
}

#[test]
fn cursor_on_empty_batch_is_illegal_state() {
    let endpoint = RecordingEndpoint::new();
    let err = SelectionBuilder::new(&endpoint)
        .with_page_start_cursor(3)
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::IllegalState(_)));
    assert!(endpoint.calls().is_empty());
}

#[test]
fn short_reply_is_a_count_mismatch() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select2(vec![results(&[1], 0, -1)]);

    let err = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .select(&SelectionQuery::simple(2, 1, Forward, &[]))
        .execute()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ResultCountMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn ragged_id_buffer_is_malformed_encoding() {
    let endpoint = RecordingEndpoint::new();
    let mut page = results(&[1], 0, -1);
    page.ids = page.ids.slice(..5);
    endpoint.push_select2(vec![page]);

    let err = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]))
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::MalformedEncoding(_)));
}

#[test]
fn remote_and_transport_failures_keep_their_kind() {
    let endpoint = RecordingEndpoint::new();
    let batch = SelectionBuilder::new(&endpoint)
        .select(&SelectionQuery::simple(1, 1, Forward, &[]));

    endpoint.fail_with_remote("unknown graph");
    let err = batch.execute().unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.to_string(), "remote failure: unknown graph");

    endpoint.fail_with_transport("deadline exceeded");
    assert!(batch.execute().unwrap_err().is_transport());
}

#[test]
fn edge_batch_pages_and_steps_like_node_batches() {
    let endpoint = RecordingEndpoint::new();
    endpoint.push_select_edges(vec![
        edge_results(vec![edge(1, 2, 10), edge(1, 3, 11)], 7, -1),
        edge_results(Vec::new(), 0, -1),
    ]);
    endpoint.push_select_edges(vec![edge_results(vec![edge(1, 4, 12)], 0, 7)]);

    let pages = EdgeSelectionBuilder::new(&endpoint)
        .select_edges(1, 1, Forward, &[])
        .with_page_size(2)
        .select_edges(1, 1, Backward, &[9])
        .execute()
        .unwrap();

    let sent = select_edges_queries(endpoint.last_call());
    assert_eq!(sent[0].page, Page::new(2, -1));
    assert_eq!(sent[1].page, Page::default());
    assert_eq!(sent[1].term.direction, Backward);
    assert!(sent[1].term.destination_ids.is_some());

    assert_eq!(pages[0].edges().len(), 2);
    assert!(pages[1].is_empty());
    assert!(pages[0].has_next_page());

    let next = pages[0].next_page().unwrap();
    let step = select_edges_queries(endpoint.last_call());
    assert_eq!(step.len(), 1);
    assert_eq!(step[0].page, Page::new(2, 7));
    assert_eq!(step[0].term, sent[0].term);
    assert_eq!(next.edges(), &[edge(1, 4, 12)]);
    assert!(next.has_previous_page());
}

#[test]
fn explicit_empty_destination_filter_stays_present() {
    let endpoint = RecordingEndpoint::new();
    let term =
        QueryTerm::new(1, 1, Forward).with_destination_ids(flock_proto::ids::encode(&[]));

    EdgeSelectionBuilder::new(&endpoint)
        .select_term(term)
        .execute()
        .unwrap();

    let sent = select_edges_queries(endpoint.last_call());
    assert_eq!(sent[0].term.destination_ids.as_deref(), Some(&[][..]));
}

#[test]
fn facade_starts_batches_with_one_slot() {
    let client = FlockClient::new(RecordingEndpoint::new());
    let query = SelectionQuery::simple(5, 1, Forward, &[]);

    assert_eq!(client.select(&query).len(), 1);
    assert_eq!(client.select_edges(5, 1, Forward, &[]).len(), 1);
    assert_eq!(client.count(&query).queries().len(), 1);
    assert!(client
        .batch_execution(flock_proto::Priority::Medium)
        .operations()
        .is_empty());
}
