use assert_matches::assert_matches;

use tts_prefetch::asset::{AssetKind, Reference, recode_url};
use tts_prefetch::error::PrefetchError;

fn reference(key: &str) -> Reference {
    Reference::new(vec![key.to_string()], "http://x/asset")
}

#[test]
fn every_url_key_maps_to_exactly_one_kind() {
    let cases = [
        ("MeshURL", AssetKind::Mesh),
        ("ColliderURL", AssetKind::Mesh),
        ("AssetbundleURL", AssetKind::Bundle),
        ("AssetbundleSecondaryURL", AssetKind::Bundle),
        ("FaceURL", AssetKind::Image),
        ("BackURL", AssetKind::Image),
        ("DiffuseURL", AssetKind::Image),
        ("NormalURL", AssetKind::Image),
        ("ImageURL", AssetKind::Image),
        ("URL", AssetKind::Image),
    ];
    for (key, expected) in cases {
        assert_eq!(AssetKind::classify(&reference(key)).unwrap(), expected);
    }
}

#[test]
fn keys_outside_the_closed_world_are_an_error() {
    let err = AssetKind::classify(&reference("Nickname")).unwrap_err();
    assert_matches!(err, PrefetchError::UnresolvableAssetKind { .. });

    let empty_path = Reference::new(Vec::new(), "http://x/asset");
    let err = AssetKind::classify(&empty_path).unwrap_err();
    assert_matches!(err, PrefetchError::UnresolvableAssetKind { .. });
}

#[test]
fn recoding_is_bit_exact() {
    // Dashes, dots, colons and slashes go, underscores stay.
    assert_eq!(
        recode_url("https://example.com/a-b_c.png"),
        "httpsexamplecomab_cpng"
    );
    assert_eq!(recode_url("http://x/y.bin"), "httpxybin");
    assert_eq!(recode_url("a_b-c.d:e/f"), "a_bcdef");
}

#[test]
fn recoding_is_idempotent() {
    let once = recode_url("http://cloud-3.steamusercontent.com/ugc/12345/ABCDEF/");
    assert_eq!(recode_url(&once), once);
}
