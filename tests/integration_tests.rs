//! Integration tests for the NIST resolver
//!
//! These tests drive the full stack (cache, sources, matching, resolution
//! and serialization) against in-memory archives and a mock HTTP server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nist_resolver::cache::{DataCache, HttpArchive, Payload, RemoteArchive};
use nist_resolver::output::{to_asciibib, to_xml, XmlOptions};
use nist_resolver::sources::{DataSource, IndexSource, PubsExportSource, SourceError};
use nist_resolver::utils::{HttpClient, RetryConfig};
use nist_resolver::{GetOptions, MissReason, NistBibliography, Resolution, SearchOptions};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const FEED: &str = r#"[
  {
    "docidentifier": "NISTIR 8200",
    "doi": "10.6028/NIST.IR.8200",
    "series": "nist-ir",
    "title-main": "Interagency Report on the Status of International Cybersecurity Standardization for the Internet of Things (IoT)",
    "status": "final",
    "published-date": "2018-11-29",
    "authors": ["Michael Hogan"]
  },
  {
    "docidentifier": "NIST SP 800-57pt1r4",
    "doi": "10.6028/NIST.SP.800-57pt1r4",
    "series": "nist-sp",
    "title-main": "Recommendation for Key Management",
    "title-sub": "Part 1: General",
    "status": "final",
    "published-date": "2016-01-28"
  },
  {
    "docidentifier": "NIST SP 800-57pt1r5",
    "series": "nist-sp",
    "title-main": "Recommendation for Key Management",
    "title-sub": "Part 1: General",
    "status": "draft-public",
    "iteration": "ipd",
    "published-date": "2019-10-31",
    "comment-from": "2019-10-31",
    "comment-to": "2019-12-06"
  }
]"#;

const INDEX: &str = "- id: NIST SP 800-12r1\n  file: data/nist.sp.800-12r1.yaml\n";

/// Serves a fixed archive and counts downloads
#[derive(Debug)]
struct FixtureArchive {
    bytes: Vec<u8>,
    downloads: AtomicUsize,
}

impl FixtureArchive {
    fn new(entry: &str, content: &str) -> Arc<Self> {
        Arc::new(Self {
            bytes: zipped(entry, content),
            downloads: AtomicUsize::new(0),
        })
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteArchive for FixtureArchive {
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(None)
    }

    async fn download(&self) -> Result<Vec<u8>, SourceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(self.bytes.clone())
    }
}

fn zipped(entry: &str, content: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(content.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn feed_source(dir: &TempDir, archive: Arc<FixtureArchive>) -> Arc<dyn DataSource> {
    let cache = DataCache::new(dir.path().join("pubs-export.zip"), archive, Payload::Json);
    Arc::new(PubsExportSource::new(Arc::new(cache)))
}

fn resolver(dir: &TempDir) -> NistBibliography {
    NistBibliography::new(feed_source(dir, FixtureArchive::new("pubs-export.json", FEED)))
}

#[tokio::test]
async fn test_get_with_year() {
    let dir = TempDir::new().unwrap();
    let bib = resolver(&dir);

    let item = bib
        .get("NISTIR 8200", Some(2018), GetOptions::default())
        .await
        .unwrap()
        .expect("NISTIR 8200 should resolve");
    assert_eq!(item.primary_id(), Some("NIST IR 8200"));

    let xml = to_xml(&item, XmlOptions::default()).unwrap();
    assert!(xml.contains("<docidentifier type=\"DOI\">10.6028/NIST.IR.8200</docidentifier>"));
}

#[tokio::test]
async fn test_get_with_wrong_year_reports_miss() {
    let dir = TempDir::new().unwrap();
    let bib = resolver(&dir);

    let resolution = bib
        .resolve("NISTIR 8200", Some(2017), GetOptions::default())
        .await
        .unwrap();
    match resolution {
        Resolution::NotFound(miss) => {
            assert_eq!(miss.query, "NISTIR 8200:2017");
            assert_eq!(miss.missed_years, vec![2018]);
            assert_eq!(miss.reason, MissReason::NoMatch);
        }
        Resolution::Found(item) => panic!("unexpected match {:?}", item.primary_id()),
    }
}

#[tokio::test]
async fn test_get_public_draft_by_stage() {
    let dir = TempDir::new().unwrap();
    let bib = resolver(&dir);

    let item = bib
        .get("SP 800-57 (IPD)", None, GetOptions::default())
        .await
        .unwrap()
        .expect("draft should resolve");
    assert_eq!(item.iteration(), Some("initial"));
    assert_eq!(item.primary_id(), Some("NIST SP 800-57pt1r5 ipd"));

    let bibdata = to_xml(&item, XmlOptions { bibdata: true }).unwrap();
    assert!(bibdata.contains("<commentperiod>"));
    assert!(to_asciibib(&item, "").contains("commentperiod.to:: 2019-12-06\n"));
}

#[tokio::test]
async fn test_get_part_and_revision() {
    let dir = TempDir::new().unwrap();
    let bib = resolver(&dir);

    let item = bib
        .get("SP 800-57pt1r4", None, GetOptions::default())
        .await
        .unwrap()
        .expect("SP 800-57pt1r4 should resolve");
    assert_eq!(item.primary_id(), Some("NIST SP 800-57pt1r4"));
    assert_eq!(item.edition.as_deref(), Some("Revision 4"));
}

#[tokio::test]
async fn test_pseudo_reference_skips_lookup() {
    let dir = TempDir::new().unwrap();
    let archive = FixtureArchive::new("pubs-export.json", FEED);
    let bib = NistBibliography::new(feed_source(&dir, Arc::clone(&archive)));

    let resolution = bib
        .resolve("NIST SP 800-57 EP", None, GetOptions::default())
        .await
        .unwrap();
    assert!(matches!(
        resolution,
        Resolution::NotFound(ref miss) if miss.reason == MissReason::PseudoReference
    ));
    assert_eq!(archive.downloads(), 0);
}

#[tokio::test]
async fn test_search_lists_drafts_only_when_asked() {
    let dir = TempDir::new().unwrap();
    let bib = resolver(&dir);

    let finals = bib
        .search("SP 800-57", None, SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(finals.len(), 1);

    let drafts = bib
        .search("SP 800-57", None, SearchOptions::with_stage("IPD"))
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts.hits()[0].status.as_deref(), Some("draft-public"));
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_download() {
    let dir = TempDir::new().unwrap();
    let archive = FixtureArchive::new("pubs-export.json", FEED);
    let bib = NistBibliography::new(feed_source(&dir, Arc::clone(&archive)));

    let (a, b, c) = tokio::join!(
        bib.get("NISTIR 8200", None, GetOptions::default()),
        bib.get("SP 800-57pt1r4", None, GetOptions::default()),
        bib.search("SP 800-57", None, SearchOptions::default()),
    );
    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());
    assert_eq!(c.unwrap().len(), 1);
    assert_eq!(archive.downloads(), 1);
    assert!(dir.path().join("pubs-export.zip").exists());
}

#[tokio::test]
async fn test_fallback_to_index_documents() {
    let mut server = mockito::Server::new_async().await;
    let document = server
        .mock("GET", "/data/nist.sp.800-12r1.yaml")
        .with_status(200)
        .with_body(
            "docidentifier:\n- id: NIST SP 800-12r1\n  type: NIST\n  primary: true\n\
             title:\n- type: main\n  content: An Introduction to Information Security\n\
             date:\n- type: published\n  value: '2017-06-22'\n",
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let index_cache = DataCache::new(
        dir.path().join("index-v1.zip"),
        FixtureArchive::new("index-v1.yaml", INDEX),
        Payload::Yaml,
    );
    let index = IndexSource::new(Arc::new(index_cache), HttpClient::new().unwrap(), server.url())
        .with_retry(RetryConfig::no_retry());
    let bib = resolver(&dir).with_fallback(Arc::new(index));

    let item = bib
        .get("SP 800-12r1", Some(2017), GetOptions::default())
        .await
        .unwrap()
        .expect("index document should resolve");
    assert_eq!(item.primary_id(), Some("NIST SP 800-12r1"));
    document.assert_async().await;
}

#[tokio::test]
async fn test_missing_index_yields_no_candidates() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/index-v1.zip")
        .with_status(404)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = HttpClient::new().unwrap();
    let remote = HttpArchive::new(client.clone(), format!("{}/index-v1.zip", server.url()))
        .with_retry(RetryConfig::no_retry());
    let index_cache = DataCache::new(
        dir.path().join("index-v1.zip"),
        Arc::new(remote),
        Payload::Yaml,
    );
    let index = IndexSource::new(Arc::new(index_cache), client, server.url());
    let bib = resolver(&dir).with_fallback(Arc::new(index));

    let hits = bib
        .search("SP 800-999", None, SearchOptions::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert!(bib
        .get("SP 800-999", None, GetOptions::default())
        .await
        .unwrap()
        .is_none());
}
