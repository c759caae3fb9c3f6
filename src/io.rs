/**
 * SimReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::{stdout, BufWriter};
use std::path::Path;

use log::info;
use serde_derive::Serialize;

use crate::error::{Error, Result};
use crate::types::{Interaction, ItemId, UserId};

/// Columns the input file must provide, in any order. Further columns are ignored.
pub const USER_COLUMN: &str = "visitorid";
pub const ITEM_COLUMN: &str = "itemid";
pub const RATING_COLUMN: &str = "rating";

/// Opens an interactions file. We expect a header line naming at least the `visitorid`, `itemid`
/// and `rating` columns.
pub fn csv_reader<P: AsRef<Path>>(file: P, delimiter: u8) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(file)?;

    Ok(reader)
}

/// Reads all interactions of a file, see [`interactions_from_csv`].
pub fn read_interactions<P: AsRef<Path>>(file: P, delimiter: u8) -> Result<Vec<Interaction>> {
    let path = file.as_ref();
    let mut reader = csv_reader(path, delimiter)?;
    let interactions = interactions_from_csv(&mut reader)?;

    info!("Read {} interactions from {}", interactions.len(), path.display());

    Ok(interactions)
}

/// Decodes every record of `reader`. Missing columns, unparseable fields, non-finite ratings and
/// inputs without a single record are all reported as data format errors.
pub fn interactions_from_csv<R: io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<Interaction>> {

    let headers = reader.headers()?.clone();
    for column in [USER_COLUMN, ITEM_COLUMN, RATING_COLUMN].iter() {
        if !headers.iter().any(|header| header == *column) {
            return Err(Error::data_format(Some(1), format!("missing column '{}'", column)));
        }
    }

    let mut interactions = Vec::new();
    let mut record = csv::StringRecord::new();

    loop {
        let has_record = reader.read_record(&mut record).map_err(|failure| {
            let line = failure.position().map(|position| position.line());
            Error::data_format(line, failure.to_string())
        })?;

        if !has_record {
            break;
        }

        let line = record.position().map(|position| position.line());

        let interaction: Interaction = record.deserialize(Some(&headers))
            .map_err(|failure| Error::data_format(line, failure.to_string()))?;

        if !interaction.rating.is_finite() {
            return Err(Error::data_format(
                line, format!("rating {} is not a finite number", interaction.rating)));
        }

        interactions.push(interaction);
    }

    if interactions.is_empty() {
        return Err(Error::data_format(None, "no interactions found"));
    }

    Ok(interactions)
}

/// Struct used for JSON serialization of similar items. Field names will be used in JSON.
#[derive(Serialize)]
struct SimilarItems<'a> {
    for_item: ItemId,
    similar_items: &'a [ItemId],
}

/// Struct used for JSON serialization of user recommendations.
#[derive(Serialize)]
struct UserRecommendations<'a> {
    for_user: UserId,
    recommended_items: &'a [ItemId],
}

/// If a `path` is supplied, we write to a file at the specified path, otherwise, we output to
/// stdout.
fn output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    let out: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(File::create(Path::new(path))?)),
        None => Box::new(stdout()),
    };
    Ok(out)
}

fn write_json_lines<T: serde::Serialize>(out: &mut dyn Write, lines: impl Iterator<Item=T>) -> Result<()> {
    for line in lines {
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Outputs one JSON object per item, listing the items most similar to it.
pub fn write_similar_items(
    similar_items: &[(ItemId, Vec<ItemId>)],
    path: Option<&str>,
) -> Result<()> {
    let mut out = output(path)?;
    let lines = similar_items.iter()
        .map(|(for_item, similar)| SimilarItems { for_item: *for_item, similar_items: similar });

    write_json_lines(&mut *out, lines)
}

/// Outputs one JSON object per user, listing the items recommended to them.
pub fn write_user_recommendations(
    recommendations: &[(UserId, Vec<ItemId>)],
    path: Option<&str>,
) -> Result<()> {
    let mut out = output(path)?;
    let lines = recommendations.iter()
        .map(|(for_user, items)| UserRecommendations { for_user: *for_user, recommended_items: items });

    write_json_lines(&mut *out, lines)
}


#[cfg(test)]
mod tests {

    use super::*;

    fn parse(data: &str) -> Result<Vec<Interaction>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        interactions_from_csv(&mut reader)
    }

    #[test]
    fn reads_interactions_by_column_name() {
        let data = "timestamp,itemid,visitorid,event,rating\n\
                    1433221332117,355908,257597,view,1\n\
                    1433224214164,248676,992329,addtocart,2.5\n";

        let interactions = parse(data).unwrap();

        assert_eq!(interactions, vec![
            Interaction::new(257597, 355908, 1.0),
            Interaction::new(992329, 248676, 2.5),
        ]);
    }

    #[test]
    fn missing_columns_are_reported() {
        match parse("visitorid,itemid\n1,2\n") {
            Err(Error::DataFormat { line: Some(1), reason }) => assert!(reason.contains("rating")),
            other => panic!("expected a data format error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_fields_carry_their_line() {
        match parse("visitorid,itemid,rating\n1,2,1\n3,not-a-number,1\n") {
            Err(Error::DataFormat { line: Some(3), .. }) => {},
            other => panic!("expected a data format error, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_ratings_are_rejected() {
        assert!(parse("visitorid,itemid,rating\n1,2,NaN\n").is_err());
        assert!(parse("visitorid,itemid,rating\n1,2,inf\n").is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        match parse("visitorid,itemid,rating\n") {
            Err(Error::DataFormat { .. }) => {},
            other => panic!("expected a data format error, got {:?}", other),
        }
    }

    #[test]
    fn reads_from_disk_and_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("interactions.csv");
        std::fs::write(&input, "visitorid\titemid\trating\n1\t10\t1\n2\t20\t3\n").unwrap();

        let interactions = read_interactions(&input, b'\t').unwrap();
        assert_eq!(interactions.len(), 2);

        let output_path = dir.path().join("similar.json");
        let similar = vec![(10, vec![20]), (20, vec![])];
        write_similar_items(&similar, output_path.to_str()).unwrap();

        let written = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(written,
            "{\"for_item\":10,\"similar_items\":[20]}\n{\"for_item\":20,\"similar_items\":[]}\n");
    }
}
