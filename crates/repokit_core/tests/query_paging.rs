mod common;

use common::{seed_employees, unit_of_work, Employee};
use repokit_core::{OrderBy, Predicate};

fn first_names(items: &[Employee]) -> Vec<String> {
    items.iter().map(|e| e.first_name.clone()).collect()
}

#[test]
fn get_all_without_filter_returns_everything_in_natural_order() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 5);
    let repo = uow.repository::<Employee>();

    let all = repo.get_all(None, None).into_result().unwrap();
    assert_eq!(
        first_names(&all),
        vec!["Emp00", "Emp01", "Emp02", "Emp03", "Emp04"]
    );
}

#[test]
fn filtered_result_is_subset_of_full_result() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 9);
    let repo = uow.repository::<Employee>();
    let even = Predicate::new(|e: &Employee| e.last_name == "Even");

    let all = repo.get_all(None, None).into_data();
    let filtered = repo.get_all(Some(even.clone()), None).into_data();

    assert_eq!(filtered.len(), 5);
    assert!(filtered.iter().all(|e| even.matches(e)));
    assert!(filtered.iter().all(|e| all.contains(e)));
}

#[test]
fn ordering_applies_after_filtering() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 6);
    let repo = uow.repository::<Employee>();

    let result = repo.get_all(
        Some(Predicate::new(|e: &Employee| e.last_name == "Odd")),
        Some(OrderBy::desc(|e: &Employee| e.first_name.clone())),
    );
    assert_eq!(first_names(result.data()), vec!["Emp05", "Emp03", "Emp01"]);
}

#[test]
fn ascending_and_descending_orders_return_same_count() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 12);
    let repo = uow.repository::<Employee>();

    let asc = repo.get_all(None, Some(OrderBy::asc(|e: &Employee| e.first_name.clone())));
    let desc = repo.get_all(None, Some(OrderBy::desc(|e: &Employee| e.first_name.clone())));
    assert_eq!(asc.data().len(), 12);
    assert_eq!(desc.data().len(), 12);
    let mut reversed = desc.into_data();
    reversed.reverse();
    assert_eq!(asc.into_data(), reversed);
}

#[test]
fn second_page_has_page_size_items() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 25);
    let repo = uow.repository::<Employee>();

    let page = repo.get_all_by_paging(2, 10, None, None);
    assert!(page.is_success());
    assert_eq!(page.data().len(), 10);
    assert_eq!(page.data()[0].first_name, "Emp10");
}

#[test]
fn pages_concatenate_without_gaps_or_duplicates() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 23);
    let repo = uow.repository::<Employee>();
    let filter = || Some(Predicate::new(|e: &Employee| e.first_name != "Emp07"));
    let order = || {
        Some(
            OrderBy::desc(|e: &Employee| e.last_name.clone())
                .then_asc(|e: &Employee| e.first_name.clone()),
        )
    };

    let expected = repo.get_all(filter(), order()).into_data();
    let mut stitched = Vec::new();
    for index in 1..=5 {
        let page = repo
            .get_all_by_paging(index, 5, order(), filter())
            .into_result()
            .unwrap();
        assert!(page.len() <= 5);
        stitched.extend(page);
    }
    assert_eq!(stitched, expected);
}

#[test]
fn unfiltered_pages_match_natural_order() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 7);
    let repo = uow.repository::<Employee>();

    let mut stitched = Vec::new();
    for index in 1..=3 {
        stitched.extend(repo.get_all_by_paging(index, 3, None, None).into_data());
    }
    assert_eq!(stitched, repo.get_all(None, None).into_data());
}

#[test]
fn page_past_the_end_is_empty_success() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 3);
    let repo = uow.repository::<Employee>();

    let page = repo.get_all_by_paging(9, 10, None, None);
    assert!(page.is_success());
    assert!(page.data().is_empty());
}

#[test]
fn zero_page_index_or_size_is_an_argument_failure() {
    let mut uow = unit_of_work();
    seed_employees(&mut uow, 3);
    let repo = uow.repository::<Employee>();

    let bad_index = repo.get_all_by_paging(0, 10, None, None);
    assert!(!bad_index.is_success());
    assert!(bad_index.data().is_empty());
    assert!(bad_index.status().errors()[0].contains("page index"));

    let bad_size = repo.get_all_by_paging(1, 0, None, None);
    assert!(!bad_size.is_success());
    assert!(bad_size.status().errors()[0].contains("page size"));
}
