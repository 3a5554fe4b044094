/// External database ids pulled out of Plex style GUID strings.
///
/// GUIDs come in the new agent form (`tmdb://603`, `tvdb://81189`, `imdb://tt0133093`,
/// `plex://movie/5d776...`) or the legacy agent form
/// (`com.plexapp.agents.themoviedb://603?lang=en`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalIds {
    pub tmdb_id: Option<u32>,
    pub tvdb_id: Option<u32>,
    pub imdb_id: Option<String>,
    /// Metadata id of a `plex://` GUID (last path segment)
    pub plex_metadata_id: Option<String>,
}

impl ExternalIds {
    pub fn from_guids<'a, I>(guids: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut ids = ExternalIds::default();
        for guid in guids {
            if ids.tmdb_id.is_none() {
                ids.tmdb_id = parse_tmdb_from_guid(guid);
            }
            if ids.tvdb_id.is_none() {
                ids.tvdb_id = parse_tvdb_from_guid(guid);
            }
            if ids.imdb_id.is_none() {
                ids.imdb_id = parse_imdb_from_guid(guid);
            }
            if ids.plex_metadata_id.is_none() {
                ids.plex_metadata_id = parse_plex_metadata_id(guid);
            }
        }
        ids
    }
}

/// Value part of `<scheme>://<value>`, without query string.
fn guid_value<'a>(guid: &'a str, schemes: &[&str]) -> Option<&'a str> {
    let (scheme, rest) = guid.split_once("://")?;
    if !schemes.iter().any(|s| scheme.ends_with(s)) {
        return None;
    }
    rest.split('?')
        .next()
        .and_then(|s| s.split('&').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn parse_tmdb_from_guid(guid: &str) -> Option<u32> {
    guid_value(guid, &["tmdb", "themoviedb"]).and_then(|v| v.parse().ok())
}

pub fn parse_tvdb_from_guid(guid: &str) -> Option<u32> {
    guid_value(guid, &["tvdb", "thetvdb"])
        // legacy TV agent appends season/episode: thetvdb://81189/1/2
        .and_then(|v| v.split('/').next())
        .and_then(|v| v.parse().ok())
}

pub fn parse_imdb_from_guid(guid: &str) -> Option<String> {
    let id = guid_value(guid, &["imdb"])?;
    if id.starts_with("tt") && id.len() >= 9 && id[2..].chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

pub fn parse_plex_metadata_id(guid: &str) -> Option<String> {
    let (scheme, rest) = guid.split_once("://")?;
    if scheme != "plex" {
        return None;
    }
    rest.split('?')
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_agent_guids() {
        assert_eq!(parse_tmdb_from_guid("tmdb://603"), Some(603));
        assert_eq!(parse_tvdb_from_guid("tvdb://81189"), Some(81189));
        assert_eq!(parse_imdb_from_guid("imdb://tt0133093"), Some("tt0133093".to_string()));
        assert_eq!(
            parse_plex_metadata_id("plex://movie/5d776c7f594b2b001e6f534d"),
            Some("5d776c7f594b2b001e6f534d".to_string())
        );
    }

    #[test]
    fn test_parse_legacy_agent_guids() {
        assert_eq!(parse_tmdb_from_guid("com.plexapp.agents.themoviedb://603?lang=en"), Some(603));
        assert_eq!(parse_tvdb_from_guid("com.plexapp.agents.thetvdb://81189/1/2?lang=en"), Some(81189));
        assert_eq!(
            parse_imdb_from_guid("com.plexapp.agents.imdb://tt0133093?lang=en"),
            Some("tt0133093".to_string())
        );
    }

    #[test]
    fn test_rejects_foreign_or_broken_guids() {
        assert_eq!(parse_tmdb_from_guid("tvdb://81189"), None);
        assert_eq!(parse_tmdb_from_guid("tmdb://abc"), None);
        assert_eq!(parse_imdb_from_guid("imdb://nm0000206"), None);
        assert_eq!(parse_plex_metadata_id("tmdb://603"), None);
        assert_eq!(parse_plex_metadata_id("no-scheme"), None);
    }

    #[test]
    fn test_from_guids_collects_first_of_each() {
        let guids = vec![
            "plex://show/5d9c086c46115600200aa2fe".to_string(),
            "imdb://tt0944947".to_string(),
            "tmdb://1399".to_string(),
            "tvdb://121361".to_string(),
        ];
        let ids = ExternalIds::from_guids(&guids);
        assert_eq!(ids.tmdb_id, Some(1399));
        assert_eq!(ids.tvdb_id, Some(121361));
        assert_eq!(ids.imdb_id.as_deref(), Some("tt0944947"));
        assert_eq!(ids.plex_metadata_id.as_deref(), Some("5d9c086c46115600200aa2fe"));
    }
}
