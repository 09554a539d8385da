//! Common test utilities for repotally integration tests.
//!
//! Provides the shipped language registry, realistic source fixtures with
//! known counts, and clone-driver doubles so queue tests never touch the
//! network.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use repotally::clone::CloneDriver;
use repotally::config::Config;
use repotally::error::CloneError;
use repotally::registry::LanguageRegistry;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Loads the language table that ships with the crate.
pub fn registry() -> Arc<LanguageRegistry> {
    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/languages.json"));
    Arc::new(LanguageRegistry::load(path).expect("Failed to load shipped language table"))
}

/// Config tuned for tests: tiny budgets, reconcile on every other write,
/// scratch confined to the given directory.
pub fn test_config(scratch: &Path) -> Config {
    Config {
        max_disk_bytes: 1024 * 1024 * 1024,
        max_repo_bytes: 100 * 1024 * 1024,
        sync_every: 2,
        use_file_workers: false,
        debug: false,
        port: 0,
        github_token: None,
        scratch_dir: scratch.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Per-file fixtures: 16/16/26/16 lines with known blank and comment counts.
// ---------------------------------------------------------------------------

/// Python, 16 lines, 4 blank, 8 comments.
pub const PYTHON_MIXED: &str = r#"# This program calculates the sum of two numbers entered by the user

# Step 1: Request the first number from the user
a = int(input("Enter the first number: "))

# Step 2: Request the second number from the user
b = int(input("Enter the second number: "))

"""
Step 3: Add the two numbers
The result is stored in the variable 'sum'
"""
sum = a + b

# Step 4: Display the result
print("The sum of the numbers is:", sum)"#;

/// JavaScript, 16 lines, 2 blank, 8 comments.
pub const JAVASCRIPT_MIXED: &str = r#"// This program checks if a number entered by the user is even or odd

// Step 1: Request a number from the user
let number = parseInt(prompt("Enter a number:") || "0");

/*
Step 2: Check if the number is even or odd
- A number is even if it is divisible by 2 with no remainder
- If the remainder is 0, the number is even
- Otherwise, the number is odd
*/
if (number % 2 === 0) {
    console.log("The number is even.");
} else {
    console.log("The number is odd.");
}"#;

/// Go, 26 lines, 4 blank, 8 comments.
pub const GO_MIXED: &str = r#"package main

import "fmt"

func main() {
    // Step 1: Declare a variable to store the number
    var number int

    // Step 2: Request a number from the user
    fmt.Print("Enter a number: ")
    fmt.Scan(&number)

    /*
    Step 3: Check if the number is positive, negative, or zero
    - If the number is greater than 0, it's positive
    - If the number is less than 0, it's negative
    - If the number is 0, it's neither positive nor negative
    */
    if number > 0 {
        fmt.Println("The number is positive.")
    } else if number < 0 {
        fmt.Println("The number is negative.")
    } else {
        fmt.Println("The number is zero.")
    }
}"#;

/// Bash, 16 lines, 3 blank, 6 comments (the shebang itself counts: `#` is
/// Bash's line marker). Meant for a file without an extension.
pub const BASH_SCRIPT: &str = r#"#!/bin/bash

# This script checks if a directory exists and creates it if it doesn't

# Step 1: Define the directory name
DIR_NAME="my_directory"

# Step 2: Check if the directory exists
if [ -d "$DIR_NAME" ]; then
    # If the directory exists, print a message
    echo "Directory '$DIR_NAME' already exists."
else
    # If the directory does not exist, create it
    mkdir "$DIR_NAME"
    echo "Directory '$DIR_NAME' has been created."
fi"#;

// ---------------------------------------------------------------------------
// Three-file repository: 3 files, 50 lines, 11 blank, 21 comments in total.
// ---------------------------------------------------------------------------

/// Python, 14 lines, 3 blank, 7 comments.
pub const PY_SNIPPET: &str = r#"# This is a single-line comment in Python

"""
 This is a block comment in Python
 Also called a multi-line string if not used as a comment
"""

# Function to multiply two numbers
def multiply(a, b):
    return a * b  # Return the product of a and b

# Call the function
result = multiply(5, 3)
print(result)  # Output: 15"#;

/// JavaScript, 15 lines, 3 blank, 7 comments.
pub const JS_SNIPPET: &str = r#"// This is a single-line comment in JavaScript

/*
 This is a block comment in JavaScript
 It can span multiple lines
*/

// Function to add two numbers
function add(a, b) {
    return a + b; // Return the sum of a and b
}

// Call the function
let result = add(5, 3);
console.log(result); // Output: 8"#;

/// Go, 21 lines, 5 blank, 7 comments.
pub const GO_SNIPPET: &str = r#"// This is a single-line comment in Go

/*
 This is a block comment in Go
 It can span multiple lines
*/

package main

import "fmt"

// Function to subtract two numbers
func subtract(a int, b int) int {
    return a - b // Return the difference between a and b
}

func main() {
    // Call the function
    result := subtract(5, 3)
    fmt.Println(result) // Output: 2
}"#;

/// Writes the three-file repository fixture under `dir`.
pub fn write_three_file_repo(dir: &Path) {
    for (name, body) in [
        ("multiply.py", PY_SNIPPET),
        ("add.js", JS_SNIPPET),
        ("subtract.go", GO_SNIPPET),
    ] {
        fs::write(dir.join(name), body).expect("Failed to write fixture file");
    }
}

// ---------------------------------------------------------------------------
// Clone-driver doubles
// ---------------------------------------------------------------------------

/// CloneDriver that materializes a fixed file set, standing in for the
/// network. Tracks how many times it was invoked so admission tests can
/// assert a rejected task never cloned.
pub struct FixtureCloner {
    files: Vec<(&'static str, &'static str)>,
    pub calls: AtomicUsize,
}

impl FixtureCloner {
    pub fn new(files: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            files,
            calls: AtomicUsize::new(0),
        }
    }

    /// The three-file repository with known totals.
    pub fn small_repo() -> Self {
        Self::new(vec![
            ("multiply.py", PY_SNIPPET),
            ("add.js", JS_SNIPPET),
            ("subtract.go", GO_SNIPPET),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CloneDriver for FixtureCloner {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), CloneError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for (name, body) in &self.files {
            let path = dest.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| CloneError::Fetch(e.to_string()))?;
            }
            fs::write(&path, body).map_err(|e| CloneError::Fetch(e.to_string()))?;
        }

        Ok(())
    }
}

/// CloneDriver that always fails, as a hung-up remote would.
pub struct FailingCloner;

impl CloneDriver for FailingCloner {
    fn clone_repo(&self, _url: &str, _dest: &Path) -> Result<(), CloneError> {
        Err(CloneError::Fetch("remote hung up unexpectedly".to_string()))
    }
}
