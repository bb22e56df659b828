use pretty_assertions::assert_eq;

use super::assert_migrates;

#[test]
fn writable_argument_becomes_the_return_value() {
    let migrated = assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class WrapArgumentAdvice {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enterSchedule(
            @Advice.Argument(value = 2, readOnly = false) Runnable runnable) {
        runnable = TaskWrapper.wrap(runnable);
    }

}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;
import net.bytebuddy.asm.Advice.AssignReturned.ToArguments.ToArgument;

public class WrapArgumentAdvice {
    @AssignReturned.ToArguments({@ToArgument(2)})
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static Runnable enterSchedule(@Advice.Argument(2) Runnable runnable) {
        return TaskWrapper.wrap(runnable);
    }
}
"#,
    );
    assert_eq!(migrated.report.migrated_classes, vec!["WrapArgumentAdvice"]);
    assert_eq!(
        migrated.report.imports_added,
        vec![
            "net.bytebuddy.asm.Advice.AssignReturned",
            "net.bytebuddy.asm.Advice.AssignReturned.ToArguments.ToArgument",
        ]
    );
}

#[test]
fn packed_fields_keep_their_evaluation_order() {
    assert_migrates(
        r#"package demo;

import net.bytebuddy.asm.Advice;

public class MyAdvice {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enter(@Advice.FieldValue(value = "field0", readOnly = false) String field0,
                             @Advice.FieldValue(value = "myField", readOnly = false) String field1,
                             @Advice.FieldValue(value = "myOtherField", readOnly = false) String field2
    ) {
        field2 = "foo";
        field1 = "bar" + field2;
        field0 = "42";
    }

}
"#,
        r#"package demo;

import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;
import net.bytebuddy.asm.Advice.AssignReturned.ToFields.ToField;

public class MyAdvice {
    @AssignReturned.ToFields({@ToField(value = "field0", index = 0), @ToField(value = "myField", index = 1), @ToField(value = "myOtherField", index = 2)})
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static Object[] enter(@Advice.FieldValue("myField") String field1, @Advice.FieldValue("myOtherField") String field2) {
        field2 = "foo";
        field1 = "bar" + field2;
        return new Object[]{"42", field1, field2};
    }
}
"#,
    );
}

#[test]
fn every_exit_path_returns_the_written_value() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class StatusAdvice {
    @Advice.OnMethodExit(onThrowable = Throwable.class)
    public static void exit(@Advice.Return(readOnly = false) int status, @Advice.Thrown Throwable error) {
        if (error != null) {
            status = 500;
            return;
        }
        status = status + 1;
    }
}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;

public class StatusAdvice {
    @AssignReturned.ToReturned
    @Advice.OnMethodExit(onThrowable = Throwable.class)
    public static int exit(@Advice.Return int status, @Advice.Thrown Throwable error) {
        if (error != null) {
            return 500;
        }
        return status + 1;
    }
}
"#,
    );
}

#[test]
fn read_only_bindings_are_left_alone() {
    let src = r#"import net.bytebuddy.asm.Advice;

public class LoggingAdvice {
    @Advice.OnMethodEnter
    public static void enter(@Advice.Argument(0) String name, @Advice.Return(readOnly = true) Object value) {
        Log.info(name);
    }
}
"#;
    let migrated = super::migrate(src);
    assert!(!migrated.report.is_changed());
    assert_eq!(migrated.text, src);
}
