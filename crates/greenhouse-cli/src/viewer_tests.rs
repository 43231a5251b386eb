use greenhouse_core::Reading;
use ratatui::layout::Constraint;
use ratatui::style::Color;

use crate::viewer::{catalog_color, format_reading, node_constraints, ChartSeries};

fn series(points: &[(f64, f64)]) -> ChartSeries {
    ChartSeries {
        label: "test".to_string(),
        color: Color::White,
        points: points.to_vec(),
    }
}

#[test]
fn readings_render_for_panels() {
    assert_eq!(format_reading(&Reading::Number(21.456)), "21.5");
    assert_eq!(format_reading(&Reading::Boolean(true)), "on");
    assert_eq!(format_reading(&Reading::Boolean(false)), "off");
    assert_eq!(format_reading(&Reading::Text("LLENO".to_string())), "LLENO");
}

#[test]
fn catalog_colors_map_to_terminal_colors() {
    assert_eq!(catalog_color("red"), Color::Red);
    assert_eq!(catalog_color("purple"), Color::Magenta);
    assert_eq!(catalog_color("#4CAF50"), Color::Rgb(0x4C, 0xAF, 0x50));
    assert_eq!(catalog_color("not-a-color"), Color::Gray);
}

#[test]
fn empty_charts_get_default_bounds() {
    // Arrange
    let charts = vec![series(&[]), series(&[])];

    // Act
    let y = ChartSeries::bounds(&charts);
    let x = ChartSeries::x_min(&charts);

    // Assert
    assert_eq!(y, [0.0, 1.0]);
    assert_eq!(x, -1.0);
}

#[test]
fn bounds_cover_every_series_with_padding() {
    // Arrange
    let charts = vec![
        series(&[(-30.0, 20.0), (-5.0, 22.0)]),
        series(&[(-60.0, 19.0), (0.0, 25.0)]),
    ];

    // Act
    let y = ChartSeries::bounds(&charts);
    let x = ChartSeries::x_min(&charts);

    // Assert
    assert!(y[0] < 19.0 && y[1] > 25.0);
    assert_eq!(x, -60.0);
}

#[test]
fn flat_series_gets_unit_margin() {
    let charts = vec![series(&[(-10.0, 3.0), (-5.0, 3.0)])];

    assert_eq!(ChartSeries::bounds(&charts), [2.0, 4.0]);
}

#[test]
fn node_row_has_a_column_per_node() {
    assert_eq!(node_constraints(6), vec![Constraint::Ratio(1, 6); 6]);
    assert_eq!(node_constraints(4).len(), 4);
    assert_eq!(node_constraints(0), vec![Constraint::Ratio(1, 1)]);
}
