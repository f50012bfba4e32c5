//! Checks that the crate version is in sync with the docs.

use version_sync::assert_markdown_deps_updated;

#[test]
fn readme_is_in_sync() {
    assert_markdown_deps_updated!("README.md");
}
