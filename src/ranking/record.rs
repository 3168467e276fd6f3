// Team records - cumulative wins and losses through each completed week
//
// One record per week holding completed games, then a season-final record
// (week None). Tied games count as neither a win nor a loss.

use super::{SeasonData, TeamRecordDraft};
use crate::domain::{Game, TeamId, TeamRecordValue};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct TeamRecordService;

impl TeamRecordService {
    pub fn new() -> Self {
        TeamRecordService
    }

    pub fn calculate_for_season(&self, data: &SeasonData) -> Vec<TeamRecordDraft> {
        let mut records: Vec<TeamRecordDraft> = data
            .completed_weeks()
            .into_iter()
            .map(|week| TeamRecordDraft {
                week: Some(week),
                values: record_values(data, data.completed_games().filter(|g| g.week <= week)),
            })
            .collect();

        records.push(TeamRecordDraft {
            week: None,
            values: record_values(data, data.completed_games()),
        });
        records
    }
}

fn record_values<'a>(
    data: &SeasonData,
    games: impl Iterator<Item = &'a Game>,
) -> Vec<TeamRecordValue> {
    let mut tallies: BTreeMap<TeamId, (u32, u32)> =
        data.teams.keys().map(|team_id| (*team_id, (0, 0))).collect();

    for game in games {
        if let (Some(winner), Some(loser)) = (game.winning_team_id(), game.losing_team_id()) {
            tallies.entry(winner).or_default().0 += 1;
            tallies.entry(loser).or_default().1 += 1;
        }
    }

    let mut values: Vec<TeamRecordValue> = tallies
        .into_iter()
        .map(|(team_id, (wins, losses))| TeamRecordValue {
            team_id,
            wins,
            losses,
        })
        .collect();
    values.sort_by(|a, b| {
        data.team_name(a.team_id)
            .cmp(data.team_name(b.team_id))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::testing::SeasonBuilder;
    use crate::domain::SeasonSection;

    #[test]
    fn test_cumulative_weekly_records_and_final() {
        let mut season = SeasonBuilder::new(2016);
        let bama = season.fbs("Alabama");
        let clemson = season.fbs("Clemson");
        let usc = season.fbs("USC");

        season.result(1, bama, 52, usc, 6, SeasonSection::RegularSeason);
        season.result(2, usc, 17, clemson, 17, SeasonSection::RegularSeason);
        season.result(3, clemson, 35, bama, 31, SeasonSection::Postseason);
        season.scheduled(4, bama, usc);
        let data = season.build();

        let records = TeamRecordService::new().calculate_for_season(&data);
        let weeks: Vec<Option<u32>> = records.iter().map(|r| r.week).collect();
        assert_eq!(weeks, vec![Some(1), Some(2), Some(3), None]);

        let summary = |record: &TeamRecordDraft| -> Vec<(u32, u32)> {
            record.values.iter().map(|v| (v.wins, v.losses)).collect()
        };
        // Alabama, Clemson, USC
        assert_eq!(summary(&records[0]), vec![(1, 0), (0, 0), (0, 1)]);
        assert_eq!(summary(&records[1]), vec![(1, 0), (0, 0), (0, 1)]);
        assert_eq!(summary(&records[3]), vec![(1, 1), (1, 0), (0, 1)]);
        assert_eq!(records[3].values[0].team_id, bama);
    }

    #[test]
    fn test_season_without_results_has_only_final_record() {
        let mut season = SeasonBuilder::new(2020);
        let a = season.fbs("Army");
        let b = season.fbs("Navy");
        season.scheduled(1, a, b);

        let records = TeamRecordService::new().calculate_for_season(&season.build());
        assert_eq!(records.len(), 1);
        assert!(records[0].values.iter().all(|v| v.games() == 0));
    }
}
