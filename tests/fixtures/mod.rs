//! Shared test fixtures for integration tests.
#![allow(dead_code)] // Each test binary uses a different subset

use std::fs;
use std::path::Path;

use schemagate::config::{AuthConfig, Config, StorageConfig};
use schemagate::models::{DataType, Template};
use rust_xlsxwriter::Workbook;
use schemagate::services::auth::hash_password;
use tempfile::TempDir;

/// Username accepted by [`test_config`].
pub const TEST_USERNAME: &str = "operator";

/// Password accepted by [`test_config`].
pub const TEST_PASSWORD: &str = "s3cret";

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "schemagate-test-boundary";

/// Creates a storage root containing the given folders.
///
/// A hidden directory and a stray file are added as well; neither should
/// ever be listed as a folder.
pub fn storage_with_folders(folders: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for folder in folders {
        fs::create_dir(temp_dir.path().join(folder)).expect("Failed to create folder");
    }
    fs::create_dir(temp_dir.path().join(".cache")).expect("Failed to create hidden dir");
    fs::write(temp_dir.path().join("README.txt"), "not a folder").expect("Failed to write file");
    temp_dir
}

/// Configuration rooted at `root` with the test credentials.
pub fn test_config(root: &Path) -> Config {
    Config {
        storage: StorageConfig {
            root: root.to_path_buf(),
            templates_file: Some(root.join(".cache").join("templates.json")),
        },
        auth: AuthConfig {
            username: TEST_USERNAME.to_string(),
            password_sha256: hash_password(TEST_PASSWORD),
        },
        ..Config::default()
    }
}

/// Template for the `sales` folder used across tests.
pub fn sales_template() -> Template {
    Template::from_columns([
        ("id", DataType::Int64),
        ("amount", DataType::Float64),
        ("region", DataType::Object),
    ])
}

/// Two rows matching [`sales_template`].
pub const SALES_CSV: &str = "id,amount,region\n1,9.5,North\n2,3.25,South\n";

/// Three rows matching [`sales_template`].
pub const SALES_CSV_MORE: &str = "id,amount,region\n3,1.5,East\n4,2.5,West\n5,7.0,North\n";

/// Workbook holding the rows of [`SALES_CSV`] on its first sheet.
pub fn sales_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.write_string(0, 0, "id").unwrap();
    worksheet.write_string(0, 1, "amount").unwrap();
    worksheet.write_string(0, 2, "region").unwrap();
    for (row, (id, amount, region)) in [(1.0, 9.5, "North"), (2.0, 3.25, "South")]
        .into_iter()
        .enumerate()
    {
        let row = row as u32 + 1;
        worksheet.write_number(row, 0, id).unwrap();
        worksheet.write_number(row, 1, amount).unwrap();
        worksheet.write_string(row, 2, region).unwrap();
    }

    workbook.save_to_buffer().expect("Failed to build workbook")
}

/// Builds a `multipart/form-data` body with one file field.
///
/// Returns the `Content-Type` header value and the body bytes.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
