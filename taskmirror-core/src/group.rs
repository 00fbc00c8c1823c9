//! Category grouping projection for presentation code.
//!
//! A pure projection over a canonical snapshot: tasks bucketed by
//! category, the empty category collected under [`UNCATEGORIZED`].
//! The engine never stores the sentinel; it exists only in this view.

use taskmirror_types::Task;

/// Bucket label for tasks whose category is empty.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One category bucket in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    /// Category label ([`UNCATEGORIZED`] for the empty category).
    pub category: &'a str,
    /// Tasks in the bucket, in snapshot order.
    pub tasks: Vec<&'a Task>,
}

/// Group a snapshot by category, buckets sorted by label.
pub fn group_by_category(tasks: &[Task]) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    for task in tasks {
        let label = if task.category.is_empty() {
            UNCATEGORIZED
        } else {
            task.category.as_str()
        };
        match groups.iter_mut().find(|g| g.category == label) {
            Some(group) => group.tasks.push(task),
            None => groups.push(CategoryGroup {
                category: label,
                tasks: vec![task],
            }),
        }
    }
    groups.sort_by(|a, b| a.category.cmp(b.category));
    groups
}
