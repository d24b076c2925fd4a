mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{create_test_app, remote, sample_package, short_names, FakeCatalogClient};
use lectio::downloads::DownloadState;
use lectio::storage::VerseIndex;
use lectio::Error;

fn two_translations() -> FakeCatalogClient {
    FakeCatalogClient::new(vec![
        remote("KJV", "King James Version", "en_gb"),
        remote("BBE", "Basic English", "en_gb"),
    ])
    .with_package("KJV", sample_package("KJV"))
    .with_package("BBE", sample_package("BBE"))
}

#[tokio::test]
async fn test_download_moves_translation_to_downloaded() {
    let client = Arc::new(two_translations());
    let (temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();

    let kjv = app.repository.find("KJV").unwrap();
    app.downloads.download(kjv).unwrap().wait().await.unwrap();

    let mut downloaded = app.repository.downloaded_translations();
    let mut available = app.repository.available_translations();
    assert_eq!(short_names(&downloaded.next().await.unwrap()), vec!["KJV"]);
    assert_eq!(short_names(&available.next().await.unwrap()), vec!["BBE"]);

    let bbe = app.repository.find("BBE").unwrap();
    let installed = app.downloads.download(bbe).unwrap().wait().await.unwrap();
    assert!(installed.downloaded);

    assert_eq!(short_names(&downloaded.next().await.unwrap()), vec!["BBE", "KJV"]);
    assert!(available.next().await.unwrap().is_empty());

    // content is readable and the package is gone
    let verses = app.store.read_verses("BBE", 42, 2).await.unwrap();
    assert_eq!(verses[0].text, "For God so loved the world");
    assert_eq!(app.store.read_book_names("BBE").await.unwrap()[0], "BBE book 1");
    assert!(!temp_dir.path().join("downloads").join("BBE.zip.part").exists());
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let client = Arc::new(two_translations());
    client.set_chunk_delay(Duration::from_millis(2));
    let (_temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();

    let handle = app.downloads.download(app.repository.find("KJV").unwrap()).unwrap();
    let mut states = handle.subscribe();
    let mut seen = Vec::new();
    while let Some(state) = states.next().await {
        let terminal = state.is_terminal();
        seen.push(state);
        if terminal {
            break;
        }
    }
    handle.wait().await.unwrap();

    assert_eq!(seen.last(), Some(&DownloadState::Done));
    assert!(seen.iter().any(|s| matches!(s, DownloadState::Downloading { progress } if *progress > 0)));

    let progress: Vec<u8> = seen.iter().filter_map(DownloadState::progress).collect();
    assert!(progress.iter().all(|p| *p <= 100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);

    // Installing comes after every Downloading state
    let installing = seen.iter().position(|s| *s == DownloadState::Installing);
    let last_downloading = seen
        .iter()
        .rposition(|s| matches!(s, DownloadState::Downloading { .. }));
    if let (Some(installing), Some(last_downloading)) = (installing, last_downloading) {
        assert!(last_downloading < installing);
    }
}

#[tokio::test]
async fn test_cancel_never_marks_downloaded() {
    let client = Arc::new(two_translations());
    client.set_chunk_delay(Duration::from_millis(20));
    let (temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();
    let before = app.repository.translation_list();

    let handle = app.downloads.download(app.repository.find("KJV").unwrap()).unwrap();
    let mut states = handle.subscribe();
    while let Some(state) = states.next().await {
        if matches!(state, DownloadState::Downloading { progress } if progress > 0) {
            break;
        }
    }
    handle.cancel();

    let state = handle.subscribe();
    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(state.latest(), Some(DownloadState::Cancelled));

    assert!(!app.repository.find("KJV").unwrap().downloaded);
    assert_eq!(app.repository.translation_list(), before);
    assert_eq!(app.reading.current_translation(), "");
    assert!(!temp_dir.path().join("downloads").join("KJV.zip.part").exists());
    assert!(app.store.read_verses("KJV", 0, 0).await.is_err());
}

#[tokio::test]
async fn test_second_download_is_ignored() {
    let client = Arc::new(two_translations());
    client.set_chunk_delay(Duration::from_millis(5));
    let (_temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();

    let first = app.downloads.download(app.repository.find("KJV").unwrap()).unwrap();
    assert!(app.downloads.is_active());
    assert!(app.downloads.download(app.repository.find("BBE").unwrap()).is_none());

    first.wait().await.unwrap();
    assert!(!app.downloads.is_active());
    assert!(!app.repository.find("BBE").unwrap().downloaded);

    let second = app.downloads.download(app.repository.find("BBE").unwrap()).unwrap();
    assert_eq!(second.short_name(), "BBE");
    second.wait().await.unwrap();
}

#[tokio::test]
async fn test_malformed_package_fails_cleanly() {
    let client = Arc::new(
        FakeCatalogClient::new(vec![remote("BAD", "Broken", "en_gb")])
            .with_package("BAD", b"definitely not a zip archive".to_vec()),
    );
    let (temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();
    let before = app.repository.translation_list();

    let handle = app.downloads.download(app.repository.find("BAD").unwrap()).unwrap();
    let state = handle.subscribe();
    let err = handle.wait().await.unwrap_err();

    assert!(matches!(err, Error::Package(_)));
    assert!(!err.is_recoverable());
    assert!(matches!(state.latest(), Some(DownloadState::Failed(_))));
    assert_eq!(app.repository.translation_list(), before);
    assert!(!temp_dir.path().join("downloads").join("BAD.zip.part").exists());
}

#[tokio::test]
async fn test_missing_package_is_http_error() {
    let client = Arc::new(FakeCatalogClient::new(vec![remote("NEW", "No package yet", "en_gb")]));
    let (_temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();

    let err = app
        .downloads
        .download(app.repository.find("NEW").unwrap())
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(404)));
    assert!(err.is_recoverable());
    assert!(!app.repository.find("NEW").unwrap().downloaded);
}

#[tokio::test]
async fn test_reading_after_install() {
    let client = Arc::new(two_translations());
    let (_temp_dir, app) = create_test_app(client).await;

    assert!(matches!(
        app.reading.read_current_chapter().await,
        Err(Error::NoTranslationSelected)
    ));

    app.repository.reload(true).await.unwrap();
    let kjv = app.repository.find("KJV").unwrap();
    app.downloads.download(kjv).unwrap().wait().await.unwrap();

    let chapter = app.reading.read_current_chapter().await.unwrap();
    assert_eq!(chapter.len(), 2);
    assert_eq!(chapter[0].verse_index, VerseIndex::new(0, 0, 0));

    let mut positions = app.reading.observe_current_verse_index();
    assert_eq!(positions.next().await, Some(VerseIndex::default()));
    app.reading
        .save_current_verse_index(VerseIndex::new(42, 2, 0))
        .await
        .unwrap();
    assert_eq!(positions.next().await, Some(VerseIndex::new(42, 2, 0)));
    assert_eq!(app.reading.read_current_chapter().await.unwrap().len(), 1);

    assert!(matches!(
        app.reading.save_current_verse_index(VerseIndex::new(66, 0, 0)).await,
        Err(Error::InvalidVerseIndex { .. })
    ));
    assert!(app.reading.read_chapter(0, 50).await.is_err());

    let found = app.reading.search("god loved").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].verse_index, VerseIndex::new(42, 2, 0));
    assert_eq!(app.reading.read_book_names().await.unwrap().len(), 66);
}

#[tokio::test]
async fn test_cancel_after_transfer_stops_before_install() {
    let client = Arc::new(two_translations());
    let (temp_dir, app) = create_test_app(client.clone()).await;
    app.repository.reload(true).await.unwrap();

    let handle = Arc::new(app.downloads.download(app.repository.find("KJV").unwrap()).unwrap());
    // The whole package arrives, then the cancellation lands.
    let canceller = handle.clone();
    client.set_on_exhausted(move || canceller.cancel());

    let mut states = handle.subscribe();
    let mut seen = Vec::new();
    while let Some(state) = states.next().await {
        let terminal = state.is_terminal();
        seen.push(state);
        if terminal {
            break;
        }
    }
    assert_eq!(seen.last(), Some(&DownloadState::Cancelled));
    assert!(!seen.contains(&DownloadState::Installing));

    let handle = Arc::try_unwrap(handle).ok().unwrap();
    assert!(matches!(handle.wait().await, Err(Error::Cancelled)));
    assert!(!app.repository.find("KJV").unwrap().downloaded);
    assert!(!app.store.read_translation("KJV").await.unwrap().unwrap().downloaded);
    assert_eq!(app.reading.current_translation(), "");
    assert!(app.store.read_verses("KJV", 0, 0).await.is_err());
    assert!(!temp_dir.path().join("downloads").join("KJV.zip.part").exists());
}

#[tokio::test]
async fn test_cancel_while_installing_is_ignored() {
    let client = Arc::new(two_translations());
    let (_temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();

    let handle = app.downloads.download(app.repository.find("KJV").unwrap()).unwrap();
    let mut states = handle.subscribe();
    let mut cancelled_while_installing = false;
    while let Some(state) = states.next().await {
        if state == DownloadState::Installing && !cancelled_while_installing {
            handle.cancel();
            cancelled_while_installing = true;
        }
        if state.is_terminal() {
            break;
        }
    }
    assert!(cancelled_while_installing);
    assert_eq!(handle.state(), DownloadState::Done);

    let installed = handle.wait().await.unwrap();
    assert!(installed.downloaded);
    assert_eq!(app.reading.current_translation(), "KJV");
    assert_eq!(app.reading.read_current_chapter().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_reading_with_parallel_translation() {
    let client = Arc::new(
        FakeCatalogClient::new(vec![
            remote("KJV", "King James Version", "en_gb"),
            remote("BBE", "Basic English", "en_gb"),
        ])
        .with_package("KJV", sample_package("KJV"))
        .with_package(
            "BBE",
            common::build_package("BBE", &[((0, 0), vec!["At the first God made the heaven and the earth."])]),
        ),
    );
    let (_temp_dir, app) = create_test_app(client).await;
    app.repository.reload(true).await.unwrap();
    for short_name in ["KJV", "BBE"] {
        let translation = app.repository.find(short_name).unwrap();
        app.downloads.download(translation).unwrap().wait().await.unwrap();
    }

    let parallel = vec!["BBE".to_string()];
    let chapter = app.reading.read_chapter_with_parallel(0, 0, &parallel).await.unwrap();
    assert_eq!(chapter.len(), 2);
    assert_eq!(chapter[0].parallel[0].translation_short_name, "BBE");
    assert_eq!(chapter[0].parallel[0].text, "At the first God made the heaven and the earth.");
    assert_eq!(chapter[1].parallel[0].text, "");

    app.reading
        .save_current_verse_index(VerseIndex::new(0, 0, 1))
        .await
        .unwrap();
    let verse = app.reading.read_current_verse(&parallel).await.unwrap().unwrap();
    assert_eq!(verse.text, "And the earth was without form, and void.");
    assert_eq!(verse.parallel[0].text, "");

    app.reading
        .save_current_verse_index(VerseIndex::new(0, 0, 9))
        .await
        .unwrap();
    assert!(app.reading.read_current_verse(&parallel).await.unwrap().is_none());
}
