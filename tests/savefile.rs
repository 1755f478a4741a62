use std::fs;

use assert_matches::assert_matches;
use serde_json::json;

use tts_prefetch::error::PrefetchError;
use tts_prefetch::savefile::SaveFile;

fn collect_urls(save: &SaveFile) -> Vec<String> {
    save.references().map(|reference| reference.url).collect()
}

#[test]
fn emits_url_fields_at_any_depth() {
    let save = SaveFile::from_value(json!({
        "SaveName": "Test Table",
        "TableURL": "http://x/table.png",
        "ObjectStates": [
            {
                "MeshURL": "http://x/model.obj",
                "CustomDeck": {
                    "1": { "FaceURL": "http://x/face.png", "BackURL": "http://x/back.png" }
                }
            },
            { "AssetbundleURL": "http://x/bundle" }
        ]
    }));

    assert_eq!(
        collect_urls(&save),
        vec![
            "http://x/table.png",
            "http://x/model.obj",
            "http://x/face.png",
            "http://x/back.png",
            "http://x/bundle",
        ]
    );
}

#[test]
fn reference_paths_track_the_key_chain() {
    let save = SaveFile::from_value(json!({
        "ObjectStates": [
            { "CustomMesh": { "MeshURL": "http://x/model.obj" } }
        ]
    }));

    let references: Vec<_> = save.references().collect();
    assert_eq!(references.len(), 1);
    assert_eq!(
        references[0].path,
        vec!["ObjectStates", "CustomMesh", "MeshURL"]
    );
    assert_eq!(references[0].terminal_key(), "MeshURL");
}

#[test]
fn excludes_page_url_and_non_url_keys() {
    let save = SaveFile::from_value(json!({
        "PageURL": "http://x/tablet.html",
        "Nickname": "http://x/not-a-candidate",
        "Tablet": { "PageURL": "http://x/nested-tablet.html" },
        "FaceURL": "http://x/face.png"
    }));

    assert_eq!(collect_urls(&save), vec!["http://x/face.png"]);
}

#[test]
fn excludes_empty_and_non_string_values() {
    let save = SaveFile::from_value(json!({
        "FaceURL": "",
        "BackURL": 42,
        "DiffuseURL": "http://x/tex.jpg"
    }));

    assert_eq!(collect_urls(&save), vec!["http://x/tex.jpg"]);
}

#[test]
fn strips_braced_metadata_from_urls() {
    let save = SaveFile::from_value(json!({
        "FaceURL": "http://x/{Unique}deck.png",
        "BackURL": "{all metadata}"
    }));

    // The all-metadata value strips down to nothing and is not emitted.
    assert_eq!(collect_urls(&save), vec!["http://x/deck.png"]);
}

#[test]
fn skips_non_object_sequence_elements() {
    let save = SaveFile::from_value(json!({
        "Tags": ["http://x/ignored.png", 7, null],
        "Objects": [
            "scalar",
            { "ImageURL": "http://x/kept.png" }
        ]
    }));

    assert_eq!(collect_urls(&save), vec!["http://x/kept.png"]);
}

#[test]
fn load_missing_file_is_not_found() {
    let err = SaveFile::load("/nonexistent/save.json".as_ref()).unwrap_err();
    assert_matches!(err, PrefetchError::SaveNotFound(_));
}

#[test]
fn load_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").unwrap();

    let err = SaveFile::load(&path).unwrap_err();
    assert_matches!(err, PrefetchError::MalformedSave { .. });
}

#[test]
fn load_reads_save_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.json");
    fs::write(&path, r#"{"SaveName": "Chess", "FaceURL": "http://x/b.png"}"#).unwrap();

    let save = SaveFile::load(&path).unwrap();
    assert_eq!(save.display_name(), "Chess");
    assert_eq!(collect_urls(&save), vec!["http://x/b.png"]);
}
