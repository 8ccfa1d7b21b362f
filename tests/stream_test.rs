//! Media delivery integration tests: direct files, ranges, manifests and
//! segments.

mod common;

use common::TestHarness;

#[tokio::test]
async fn full_file_is_streamed() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/a.mp4")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(bytes.len(), 100);
    assert_eq!(bytes[42], 42);
}

#[tokio::test]
async fn nested_file_is_streamed() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/sub/c.webm")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/webm");
    assert_eq!(resp.bytes().await.unwrap().len(), 10);
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let h = TestHarness::start().await;
    let resp = reqwest::Client::new()
        .get(h.url("/videos/a.mp4"))
        .header("range", "bytes=10-19")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 10-19/100");
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(bytes.as_ref(), (10..20u8).collect::<Vec<_>>().as_slice());
}

#[tokio::test]
async fn unsatisfiable_range_is_416() {
    let h = TestHarness::start().await;
    let resp = reqwest::Client::new()
        .get(h.url("/videos/a.mp4"))
        .header("range", "bytes=500-")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 416);
    assert_eq!(resp.headers()["content-range"], "bytes */100");
}

#[tokio::test]
async fn missing_file_is_404() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/nope.mp4")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn traversal_is_rejected() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/..%2F..%2Fetc%2Fpasswd"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn m3u8_falls_back_to_degraded_playlist() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/a.mp4.m3u8")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(
        resp.text().await.unwrap(),
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-MEDIA-SEQUENCE:0\n\
         #EXTINF:10.0,\na.mp4\n#EXT-X-ENDLIST\n"
    );
}

#[tokio::test]
async fn real_manifest_is_served_verbatim() {
    let h = TestHarness::start().await;
    let manifest = "#EXTM3U\n#EXT-X-TARGETDURATION:6\nclip.mp4_000.ts\n#EXT-X-ENDLIST\n";
    std::fs::write(h.media_path().join("clip.mp4.m3u8"), manifest).unwrap();

    let resp = reqwest::get(h.url("/videos/clip.mp4.m3u8")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), manifest);
}

#[tokio::test]
async fn m3u8_for_missing_media_is_404() {
    let h = TestHarness::start().await;
    let resp = reqwest::get(h.url("/videos/ghost.mp4.m3u8")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn segments_resolve_by_index() {
    let h = TestHarness::start().await;

    let ok = reqwest::get(h.url("/videos/clip.mp4_000.ts")).await.unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(ok.headers()["content-type"], "video/MP2T");
    assert_eq!(ok.text().await.unwrap(), "segment-zero");

    // Zero padding is significant.
    let unpadded = reqwest::get(h.url("/videos/clip.mp4_0.ts")).await.unwrap();
    assert_eq!(unpadded.status(), 404);

    // Without an index the name is looked up as a plain file.
    let no_index = reqwest::get(h.url("/videos/clip.mp4_.ts")).await.unwrap();
    assert_eq!(no_index.status(), 404);
}

#[tokio::test]
async fn ts_without_index_streams_as_file() {
    let h = TestHarness::start().await;
    std::fs::write(h.media_path().join("clip.ts"), b"whole-stream").unwrap();

    let resp = reqwest::get(h.url("/videos/clip.ts")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/MP2T");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    assert_eq!(resp.text().await.unwrap(), "whole-stream");

    let client = reqwest::Client::new();
    let partial = client
        .get(h.url("/videos/clip.ts"))
        .header("range", "bytes=0-4")
        .send()
        .await
        .unwrap();
    assert_eq!(partial.status(), 206);
    assert_eq!(partial.text().await.unwrap(), "whole");
}
