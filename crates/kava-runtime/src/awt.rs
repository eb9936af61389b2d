//! `java.awt.Point`, the library's one class with public mutable fields.

use kava_core::{HostResult, MemberCatalog, Object, Type, Value};

use crate::args::{int, object, receiver_object};
use crate::registry::Registry;

pub const POINT: &str = "java.awt.Point";

fn coordinate(point: &Object, name: &str) -> i32 {
    match point.field(name) {
        Some(Value::Int(v)) => v,
        _ => 0,
    }
}

fn point(x: i32, y: i32) -> Value {
    let object = Object::new(Type::class(POINT));
    object.set_field("x", Value::Int(x));
    object.set_field("y", Value::Int(y));
    Value::Object(object)
}

/// `java.awt.Point[x=1,y=2]`
pub(crate) fn describe(point: &Object) -> String {
    format!(
        "{POINT}[x={},y={}]",
        coordinate(point, "x"),
        coordinate(point, "y")
    )
}

fn set_location(cx: &dyn MemberCatalog, this: Option<&Value>, x: i32, y: i32) -> HostResult<Value> {
    let this = receiver_object(cx, this)?;
    this.set_field("x", Value::Int(x));
    this.set_field("y", Value::Int(y));
    Ok(Value::Null)
}

pub(crate) fn install(registry: &mut Registry) {
    registry
        .declare("public class java.awt.Point")
        .field("public int x")
        .field("public int y")
        .constructor("public Point()", |_, _, _| Ok(point(0, 0)))
        .constructor("public Point(int, int)", |cx, _, args| {
            Ok(point(int(cx, args, 0)?, int(cx, args, 1)?))
        })
        .constructor("public Point(Point)", |cx, _, args| {
            let other = object(cx, args, 0)?;
            Ok(point(coordinate(&other, "x"), coordinate(&other, "y")))
        })
        .method("public double getX()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(Value::Double(coordinate(&this, "x") as f64))
        })
        .method("public double getY()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(Value::Double(coordinate(&this, "y") as f64))
        })
        .method("public Point getLocation()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(point(coordinate(&this, "x"), coordinate(&this, "y")))
        })
        .method("public void setLocation(int, int)", |cx, this, args| {
            set_location(cx, this, int(cx, args, 0)?, int(cx, args, 1)?)
        })
        .method("public void setLocation(Point)", |cx, this, args| {
            let other = object(cx, args, 0)?;
            set_location(cx, this, coordinate(&other, "x"), coordinate(&other, "y"))
        })
        .method("public void move(int, int)", |cx, this, args| {
            set_location(cx, this, int(cx, args, 0)?, int(cx, args, 1)?)
        })
        .method("public void translate(int, int)", |cx, this, args| {
            let (dx, dy) = (int(cx, args, 0)?, int(cx, args, 1)?);
            let target = receiver_object(cx, this)?;
            let x = coordinate(&target, "x").wrapping_add(dx);
            let y = coordinate(&target, "y").wrapping_add(dy);
            set_location(cx, this, x, y)
        })
        .method("public double distance(Point)", |cx, this, args| {
            let this = receiver_object(cx, this)?;
            let other = object(cx, args, 0)?;
            let dx = (coordinate(&this, "x") - coordinate(&other, "x")) as f64;
            let dy = (coordinate(&this, "y") - coordinate(&other, "y")) as f64;
            Ok(Value::Double(dx.hypot(dy)))
        })
        .finish();
}
