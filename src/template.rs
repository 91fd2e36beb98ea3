pub const FILE_PREFIX: &str = "test_";
pub const FILE_EXTENSION: &str = "py";

/// File name for the placeholder at `index` (1-based), e.g. `test_007.py`.
pub fn test_file_name(index: usize) -> String {
    format!("{}{:03}.{}", FILE_PREFIX, index, FILE_EXTENSION)
}

/// Render the placeholder test module for `index`.
///
/// The output depends on nothing but the index, so regenerating a file always
/// reproduces the same bytes.
pub fn render_test_file(index: usize) -> String {
    format!(
        "import unittest

class TestCase{index:03}(unittest.TestCase):
    def test_sample(self):
        # placeholder test
        self.assertEqual(1 + 1, 2)

if __name__ == \"__main__\":
    unittest.main()
"
    )
}
