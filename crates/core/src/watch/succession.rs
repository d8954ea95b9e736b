use super::{EpisodePointer, SeriesLayout};

/// Episode that follows `(season, episode)`.
///
/// Unknown season length gives no successor. The last episode of a season
/// rolls over to the next season only when the season count is known and
/// larger; otherwise it is the finale.
pub fn next_episode(season: u32, episode: u32, layout: &SeriesLayout) -> Option<EpisodePointer> {
    let episodes_in_season = layout.episodes_in_season.filter(|n| *n > 0)?;

    if episode < episodes_in_season {
        return Some(EpisodePointer::new(season, episode + 1));
    }

    match layout.total_seasons {
        Some(total) if season < total => Some(EpisodePointer::new(season + 1, 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_season() {
        let layout = SeriesLayout::new(10, 2);
        assert_eq!(next_episode(1, 4, &layout), Some(EpisodePointer::new(1, 5)));
    }

    #[test]
    fn test_season_rollover() {
        let layout = SeriesLayout::new(10, 2);
        assert_eq!(next_episode(1, 10, &layout), Some(EpisodePointer::new(2, 1)));
    }

    #[test]
    fn test_series_finale() {
        let layout = SeriesLayout::new(10, 2);
        assert_eq!(next_episode(2, 10, &layout), None);
    }

    #[test]
    fn test_unknown_layout() {
        assert_eq!(next_episode(1, 1, &SeriesLayout::default()), None);

        let no_total = SeriesLayout {
            episodes_in_season: Some(8),
            total_seasons: None,
        };
        assert_eq!(next_episode(1, 3, &no_total), Some(EpisodePointer::new(1, 4)));
        assert_eq!(next_episode(1, 8, &no_total), None);
    }
}
