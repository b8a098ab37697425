use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::{FilesystemError, TemplateError};
use crate::filename::enclosure_url;
use crate::metadata::{format_rfc2822, EpisodeMetadata};
use crate::selector::MediaFile;

/// One episode ready to be turned into an `<item>`
#[derive(Debug, Clone)]
pub struct FeedEntry<'a> {
    pub file: &'a MediaFile,
    pub metadata: EpisodeMetadata,
}

/// A parsed RSS template with a known `<channel>` element
#[derive(Debug, Clone)]
pub struct FeedTemplate {
    path: PathBuf,
    root: Element,
}

impl FeedTemplate {
    /// Read and validate the template file
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let bytes = fs::read(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &bytes)
    }

    /// Parse template XML; `path` is only used in error messages
    pub fn parse(path: &Path, xml: &[u8]) -> Result<Self, TemplateError> {
        let root = Element::parse(xml).map_err(|e| TemplateError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if find_element(&root, "channel").is_none() {
            return Err(TemplateError::MissingChannel {
                path: path.to_path_buf(),
            });
        }

        Ok(FeedTemplate {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Fill in `lastBuildDate` and append one `<item>` per entry, in order
    pub fn build(
        self,
        build_date: &DateTime<Utc>,
        url_prefix: &str,
        entries: &[FeedEntry<'_>],
    ) -> Result<FeedDocument, TemplateError> {
        let FeedTemplate { path, mut root } = self;

        let channel = find_element_mut(&mut root, "channel")
            .ok_or(TemplateError::MissingChannel { path })?;

        let build_date = format_rfc2822(build_date);
        let updated = match find_element_mut(channel, "lastBuildDate") {
            Some(last_build) => {
                set_text(last_build, build_date.clone());
                true
            }
            None => false,
        };
        if !updated {
            warn!("template has no <lastBuildDate>, adding one to <channel>");
            channel
                .children
                .push(XMLNode::Element(text_element("lastBuildDate", build_date)));
        }

        for entry in entries {
            debug!(path = %entry.file.path.display(), "adding feed item");
            channel
                .children
                .push(XMLNode::Element(build_item(entry, url_prefix)));
        }

        Ok(FeedDocument { root })
    }
}

/// The finished feed, ready to be serialized
#[derive(Debug, Clone)]
pub struct FeedDocument {
    root: Element,
}

impl FeedDocument {
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Serialize to UTF-8 XML with a document declaration
    pub fn to_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        let config = EmitterConfig::new()
            .perform_indent(true)
            .write_document_declaration(true);

        let mut buf = Vec::new();
        self.root
            .write_with_config(&mut buf, config)
            .map_err(|e| TemplateError::Serialize(e.to_string()))?;
        buf.push(b'\n');
        Ok(buf)
    }
}

/// Write the feed to `output_path` through a temporary file in the same
/// directory, so readers never see a half-written feed.
pub fn write_feed(bytes: &[u8], output_path: &Path) -> Result<(), FilesystemError> {
    let write_err = |source: std::io::Error| FilesystemError::Write {
        path: output_path.to_path_buf(),
        source,
    };

    let dir = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // Temp files are created private; keep the old feed's mode or use 0644
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(output_path)
            .map(|m| m.permissions().mode())
            .unwrap_or(0o644);
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(write_err)?;
    }

    tmp.persist(output_path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn build_item(entry: &FeedEntry<'_>, url_prefix: &str) -> Element {
    let EpisodeMetadata {
        title,
        link_url,
        description,
        pub_date,
    } = &entry.metadata;

    let mut item = Element::new("item");

    item.children.push(XMLNode::Element(text_element(
        "title",
        title.clone().unwrap_or_default(),
    )));
    if let Some(link) = link_url {
        item.children
            .push(XMLNode::Element(text_element("link", link.clone())));
    }
    if let Some(description) = description {
        item.children.push(XMLNode::Element(text_element(
            "description",
            description.clone(),
        )));
    }
    item.children.push(XMLNode::Element(text_element(
        "pubDate",
        format_rfc2822(pub_date),
    )));

    let mut enclosure = Element::new("enclosure");
    enclosure
        .attributes
        .insert("url".to_string(), enclosure_url(url_prefix, &entry.file.path));
    enclosure
        .attributes
        .insert("length".to_string(), entry.file.size_bytes.to_string());
    enclosure.attributes.insert(
        "type".to_string(),
        entry.file.media_type.mime_type().to_string(),
    );
    item.children.push(XMLNode::Element(enclosure));

    item
}

fn text_element(name: &str, text: String) -> Element {
    let mut element = Element::new(name);
    if !text.is_empty() {
        element.children.push(XMLNode::Text(text));
    }
    element
}

fn set_text(element: &mut Element, text: String) {
    element.children = vec![XMLNode::Text(text)];
}

/// Depth-first search for the first element called `name`, starting at `element`
fn find_element<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    if element.name == name {
        return Some(element);
    }
    element.children.iter().find_map(|child| match child {
        XMLNode::Element(e) => find_element(e, name),
        _ => None,
    })
}

fn find_element_mut<'a>(element: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    if element.name == name {
        return Some(element);
    }
    for child in element.children.iter_mut() {
        if let XMLNode::Element(e) = child {
            if let Some(found) = find_element_mut(e, name) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filename::MediaType;
    use chrono::TimeZone;

    pub(crate) const TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0">
  <channel>
    <title>My Podcast</title>
    <link>http://example.com/</link>
    <description>Weekly ramblings</description>
    <lastBuildDate>never</lastBuildDate>
  </channel>
</rss>
"#;

    fn media_file(name: &str, media_type: MediaType, size_bytes: u64) -> MediaFile {
        MediaFile {
            path: PathBuf::from("/media").join(name),
            modified: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            size_bytes,
            media_type,
        }
    }

    fn metadata(title: Option<&str>, link: Option<&str>, description: Option<&str>) -> EpisodeMetadata {
        EpisodeMetadata {
            title: title.map(str::to_string),
            link_url: link.map(str::to_string),
            description: description.map(str::to_string),
            pub_date: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn build_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 8, 0, 0).unwrap()
    }

    fn children<'a>(element: &'a Element, name: &str) -> Vec<&'a Element> {
        element
            .children
            .iter()
            .filter_map(|c| match c {
                XMLNode::Element(e) if e.name == name => Some(e),
                _ => None,
            })
            .collect()
    }

    fn reparse(doc: &FeedDocument) -> Element {
        Element::parse(doc.to_bytes().unwrap().as_slice()).unwrap()
    }

    #[test]
    fn test_build_fills_items_in_order() {
        let template = FeedTemplate::parse(Path::new("t.xml"), TEMPLATE.as_bytes()).unwrap();
        let newer = media_file("Episode 2.mp3", MediaType::Mp3, 2048);
        let older = media_file("episode1.AAC", MediaType::Aac, 1024);
        let entries = vec![
            FeedEntry {
                file: &newer,
                metadata: metadata(Some("Two"), Some("http://example.com/2"), Some("Second")),
            },
            FeedEntry {
                file: &older,
                metadata: metadata(Some("One"), None, None),
            },
        ];

        let doc = template
            .build(&build_date(), "http://example.com/audio/", &entries)
            .unwrap();
        let root = reparse(&doc);
        let channel = root.get_child("channel").unwrap();

        let last_build = channel.get_child("lastBuildDate").unwrap();
        assert_eq!(
            last_build.get_text().unwrap(),
            "Sun, 30 Jun 2024 08:00:00 +0000"
        );
        assert_eq!(
            channel.get_child("title").unwrap().get_text().unwrap(),
            "My Podcast"
        );

        let items = children(channel, "item");
        assert_eq!(items.len(), 2);

        let first = items[0];
        assert_eq!(first.get_child("title").unwrap().get_text().unwrap(), "Two");
        assert_eq!(
            first.get_child("link").unwrap().get_text().unwrap(),
            "http://example.com/2"
        );
        assert_eq!(
            first.get_child("description").unwrap().get_text().unwrap(),
            "Second"
        );
        assert_eq!(
            first.get_child("pubDate").unwrap().get_text().unwrap(),
            "Tue, 2 Jan 2024 03:04:05 +0000"
        );
        let enclosure = first.get_child("enclosure").unwrap();
        assert_eq!(
            enclosure.attributes.get("url").map(String::as_str),
            Some("http://example.com/audio/Episode%202.mp3")
        );
        assert_eq!(enclosure.attributes.get("length").map(String::as_str), Some("2048"));
        assert_eq!(enclosure.attributes.get("type").map(String::as_str), Some("audio/mpeg"));

        let second = items[1];
        assert_eq!(second.get_child("title").unwrap().get_text().unwrap(), "One");
        assert!(second.get_child("link").is_none());
        assert!(second.get_child("description").is_none());
        assert_eq!(
            second
                .get_child("enclosure")
                .unwrap()
                .attributes
                .get("type")
                .map(String::as_str),
            Some("audio/aac")
        );
    }

    #[test]
    fn test_missing_title_emits_empty_element() {
        let template = FeedTemplate::parse(Path::new("t.xml"), TEMPLATE.as_bytes()).unwrap();
        let file = media_file("a.mp3", MediaType::Mp3, 1);
        let entries = vec![FeedEntry {
            file: &file,
            metadata: metadata(None, None, None),
        }];
        let doc = template.build(&build_date(), "http://x/", &entries).unwrap();
        let root = reparse(&doc);
        let items = children(root.get_child("channel").unwrap(), "item");
        let title = items[0].get_child("title").unwrap();
        assert!(title.get_text().is_none());
    }

    #[test]
    fn test_nested_last_build_date_is_found() {
        let xml = r#"<rss><channel><meta><lastBuildDate/></meta></channel></rss>"#;
        let template = FeedTemplate::parse(Path::new("t.xml"), xml.as_bytes()).unwrap();
        let doc = template.build(&build_date(), "http://x/", &[]).unwrap();
        let channel = doc.root().get_child("channel").unwrap();
        assert!(channel.get_child("lastBuildDate").is_none());
        let nested = channel.get_child("meta").unwrap().get_child("lastBuildDate").unwrap();
        assert_eq!(nested.get_text().unwrap(), "Sun, 30 Jun 2024 08:00:00 +0000");
    }

    #[test]
    fn test_missing_last_build_date_is_added() {
        let xml = r#"<rss><channel><title>t</title></channel></rss>"#;
        let template = FeedTemplate::parse(Path::new("t.xml"), xml.as_bytes()).unwrap();
        let doc = template.build(&build_date(), "http://x/", &[]).unwrap();
        let channel = doc.root().get_child("channel").unwrap();
        assert!(channel.get_child("lastBuildDate").is_some());
    }

    #[test]
    fn test_malformed_template() {
        let result = FeedTemplate::parse(Path::new("t.xml"), b"<rss><channel></rss>");
        assert!(matches!(result, Err(TemplateError::Malformed { .. })));
    }

    #[test]
    fn test_template_without_channel() {
        let result = FeedTemplate::parse(Path::new("t.xml"), b"<rss><title>x</title></rss>");
        assert!(matches!(result, Err(TemplateError::MissingChannel { .. })));
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FeedTemplate::load(&dir.path().join("missing.xml"));
        assert!(matches!(result, Err(TemplateError::Read { .. })));
    }

    #[test]
    fn test_serialization_is_stable() {
        let file = media_file("a b.mp3", MediaType::Mp3, 10);
        let build = || {
            let template = FeedTemplate::parse(Path::new("t.xml"), TEMPLATE.as_bytes()).unwrap();
            let entries = vec![FeedEntry {
                file: &file,
                metadata: metadata(Some("A"), Some("http://l/"), Some("d")),
            }];
            template
                .build(&build_date(), "http://x/", &entries)
                .unwrap()
                .to_bytes()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_write_feed_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("feed.xml");
        fs::write(&out, "old contents").unwrap();

        write_feed(b"<rss/>\n", &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "<rss/>\n");

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_feed_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("feed.xml");
        write_feed(b"<rss/>\n", &out).unwrap();
        let mode = fs::metadata(&out).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
